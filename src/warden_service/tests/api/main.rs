mod delete_account;
mod helpers;
mod login;
mod refresh_token;
mod register;
mod verify_email;
