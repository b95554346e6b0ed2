//! Authentication commands.

use std::io::BufRead;

use secrecy::SecretString;

use vdiamond_core::BearerToken;
use vdiamond_storefront::{SessionStatus, Storefront};

use super::CliError;

/// Read one line from stdin as the password, without the line ending.
fn read_password() -> Result<SecretString, CliError> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(CliError::Password)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    Ok(SecretString::from(password))
}

fn print_user(storefront: &Storefront) {
    match storefront.session().user() {
        Some(user) => println!("Signed in as {} <{}>", user.display_name(), user.email),
        None => println!("Not signed in."),
    }
}

/// # Errors
///
/// Returns an error if the password cannot be read or sign-in fails.
pub async fn login(storefront: &Storefront, email: &str) -> Result<(), CliError> {
    let password = read_password()?;
    storefront.session().login(email, &password).await?;
    print_user(storefront);
    Ok(())
}

/// # Errors
///
/// Returns an error if the password cannot be read or the backend rejects
/// the registration.
pub async fn register(storefront: &Storefront, name: &str, email: &str) -> Result<(), CliError> {
    let password = read_password()?;
    let message = storefront.session().register(name, email, &password).await?;
    if message.is_empty() {
        println!("Account created. Check your email to confirm it.");
    } else {
        println!("{message}");
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the token is missing or the backend rejects it.
pub async fn confirm_email(storefront: &Storefront, token: &str) -> Result<(), CliError> {
    let message = storefront.session().confirm_email(token).await?;
    if message.is_empty() {
        println!("Email confirmed. You can now sign in.");
    } else {
        println!("{message}");
    }
    Ok(())
}

/// # Errors
///
/// Returns an error if the URL cannot be built.
pub fn oauth_url(storefront: &Storefront) -> Result<(), CliError> {
    let url = storefront.session().oauth_login_url()?;
    println!("{url}");
    Ok(())
}

/// # Errors
///
/// Returns an error if the token is blank or its profile cannot be loaded.
pub async fn oauth_complete(storefront: &Storefront, token: String) -> Result<(), CliError> {
    storefront
        .session()
        .complete_oauth(BearerToken::new(token))
        .await?;
    print_user(storefront);
    Ok(())
}

pub async fn whoami(storefront: &Storefront) {
    storefront.start().await;

    let session = storefront.session();
    if session.status() == SessionStatus::TokenPresentUnverified {
        println!("Signed in, but your profile could not be loaded.");
        if let Some(error) = session.last_error() {
            println!("{error}");
        }
        return;
    }
    print_user(storefront);
}

pub async fn logout(storefront: &Storefront) {
    storefront.session().logout().await;
    println!("Signed out.");
}
