//! Command execution against the wired-up [`App`].

use std::io::{self, Write};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use coachsite_core::admin::ADMIN_LIST_LIMIT;
use coachsite_core::api::{ApiError, FilePart, MultipartForm, QueryParams};
use coachsite_core::auth::service::{LOGIN_FAILED, PASSWORD_CHANGE_FAILED};
use coachsite_core::data::{CONTACT_SUBMIT_FAILED, FETCH_FAILED};
use coachsite_core::models::ResourceKind;
use coachsite_core::App;
use tracing::{info, warn};

use crate::args::{AdminCommand, Command, ContactCommand};
use crate::output;

/// Fallback for admin operations the server rejects without a message.
const ADMIN_FAILED: &str = "Request failed";

/// Turn an API failure into the error shown to the user.
fn user_error(err: ApiError, fallback: &str) -> anyhow::Error {
    anyhow!(err.user_message(fallback))
}

pub async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Content { kind, query, json } => show_content(app, kind, &query, json).await,
        Command::Home { json } => {
            let value = app
                .data
                .fetch_home_sections()
                .await
                .map_err(|e| user_error(e, FETCH_FAILED))?;
            if json {
                output::print_json(&value);
            } else {
                output::print_resource(ResourceKind::Home, value)?;
            }
            Ok(())
        }
        Command::Contact(submission) => {
            let message = app
                .data
                .submit_contact(&submission)
                .await
                .map_err(|e| user_error(e, CONTACT_SUBMIT_FAILED))?;
            println!(
                "{}",
                message.unwrap_or_else(|| "Message sent. We will get back to you soon.".into())
            );
            Ok(())
        }
        Command::Login { email } => login(app, email).await,
        Command::Logout => {
            app.auth.logout().await;
            println!("Logged out");
            Ok(())
        }
        Command::Whoami => {
            let admin = app
                .auth
                .admin()
                .await
                .ok_or_else(|| anyhow!("Not logged in"))?;
            output::print_admin(&admin);
            Ok(())
        }
        Command::ChangePassword => change_password(app).await,
        Command::Admin(admin) => run_admin(app, admin).await,
        Command::Config(_) | Command::Help => Ok(()),
    }
}

async fn show_content(
    app: &App,
    kind: ResourceKind,
    query: &QueryParams,
    json: bool,
) -> Result<()> {
    let value = match kind {
        ResourceKind::Courses => app.data.fetch_courses(query).await,
        ResourceKind::Toppers => app.data.fetch_toppers(query).await,
        ResourceKind::Achievements => app.data.fetch_achievements(query).await,
        ResourceKind::Gallery => app.data.fetch_gallery(query).await,
        ResourceKind::Home => app.data.fetch_home_sections().await,
    }
    .map_err(|e| user_error(e, FETCH_FAILED))?;

    if json {
        output::print_json(&value);
    } else {
        output::print_resource(kind, value)?;
        output::print_cache_ages(&app.data.cache_ages().await);
    }
    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn login(app: &App, email: Option<String>) -> Result<()> {
    let email = match email.or_else(|| app.config.last_email.clone()) {
        Some(email) => email,
        None => prompt("Email: ")?,
    };
    let password = rpassword::prompt_password(format!("Password for {}: ", email))?;
    if email.is_empty() || password.is_empty() {
        bail!("Email and password required");
    }

    let admin = app
        .auth
        .login(&email, &password)
        .await
        .map_err(|e| user_error(e, LOGIN_FAILED))?;

    let mut config = app.config.clone();
    config.last_email = Some(email);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    println!("Logged in as {}", admin.display_name());
    Ok(())
}

async fn change_password(app: &App) -> Result<()> {
    let current = rpassword::prompt_password("Current password: ")?;
    let new = rpassword::prompt_password("New password: ")?;
    let confirm = rpassword::prompt_password("Confirm new password: ")?;
    if new != confirm {
        bail!("New passwords do not match");
    }

    let message = app
        .auth
        .change_password(&current, &new)
        .await
        .map_err(|e| user_error(e, PASSWORD_CHANGE_FAILED))?;
    println!(
        "{}",
        message.unwrap_or_else(|| "Password changed".to_string())
    );
    Ok(())
}

fn guess_mime(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Build the multipart body an admin form would submit.
///
/// Values written as JSON arrays or objects (`features=["a","b"]`) are
/// checked and sent compact; anything else goes as plain text.
fn build_form(
    kind: ResourceKind,
    fields: Vec<(String, String)>,
    file: Option<&Path>,
) -> Result<MultipartForm> {
    let mut form = MultipartForm::new();
    for (key, value) in fields {
        let trimmed = value.trim_start();
        form = if trimmed.starts_with('[') || trimmed.starts_with('{') {
            let json: serde_json::Value = serde_json::from_str(&value)
                .with_context(|| format!("{} is not valid JSON", key))?;
            form.json_field(key, &json)
        } else {
            form.text(key, value)
        };
    }

    if let Some(path) = file {
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();
        form = form.file(FilePart {
            field: kind.upload_field().to_string(),
            file_name,
            mime: guess_mime(path).to_string(),
            bytes,
        });
    }
    Ok(form)
}

async fn run_admin(app: &App, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::Dashboard => {
            let stats = app
                .admin
                .dashboard()
                .await
                .map_err(|e| user_error(e, ADMIN_FAILED))?;
            output::print_dashboard(&stats);
        }
        AdminCommand::List(kind) => {
            let query = match kind {
                ResourceKind::Home => QueryParams::new(),
                _ => QueryParams::new().limit(ADMIN_LIST_LIMIT),
            };
            let value = app
                .admin
                .list(kind, &query)
                .await
                .map_err(|e| user_error(e, ADMIN_FAILED))?;
            output::print_resource(kind, value)?;
        }
        AdminCommand::Create { kind, fields, file } => {
            let form = build_form(kind, fields, file.as_deref())?;
            let envelope = app
                .admin
                .create(kind, form)
                .await
                .map_err(|e| user_error(e, ADMIN_FAILED))?;
            info!(category = kind.cache_key(), "Created from CLI");
            println!(
                "{}",
                envelope
                    .message
                    .unwrap_or_else(|| format!("{} entry created", kind.display_name()))
            );
        }
        AdminCommand::Update {
            kind,
            key,
            fields,
            file,
        } => {
            let form = build_form(kind, fields, file.as_deref())?;
            let envelope = app
                .admin
                .update(kind, &key, form)
                .await
                .map_err(|e| user_error(e, ADMIN_FAILED))?;
            println!(
                "{}",
                envelope.message.unwrap_or_else(|| format!("Updated {}", key))
            );
        }
        AdminCommand::Delete { kind, key } => {
            let message = app
                .admin
                .delete(kind, &key)
                .await
                .map_err(|e| user_error(e, ADMIN_FAILED))?;
            println!("{}", message.unwrap_or_else(|| format!("Deleted {}", key)));
        }
        AdminCommand::Contacts(command) => run_contacts(app, command).await?,
    }
    Ok(())
}

async fn run_contacts(app: &App, command: ContactCommand) -> Result<()> {
    let admin = &app.admin;
    match command {
        ContactCommand::List => {
            let list = admin
                .list_contacts(&QueryParams::new().limit(ADMIN_LIST_LIMIT))
                .await
                .map_err(|e| user_error(e, "Failed to fetch contacts"))?;
            output::print_contacts(&list);
        }
        ContactCommand::Show(id) => {
            let contact = admin
                .view_contact(&id)
                .await
                .map_err(|e| user_error(e, "Failed to fetch contact"))?;
            output::print_contact(&contact);
        }
        ContactCommand::Update { id, update } => {
            let message = admin
                .update_contact(&id, &update)
                .await
                .map_err(|e| user_error(e, "Failed to update contact"))?;
            println!(
                "{}",
                message.unwrap_or_else(|| "Contact updated successfully!".into())
            );
        }
        ContactCommand::Delete(id) => {
            let message = admin
                .delete_contact(&id)
                .await
                .map_err(|e| user_error(e, "Failed to delete contact"))?;
            println!(
                "{}",
                message.unwrap_or_else(|| "Contact deleted successfully!".into())
            );
        }
        ContactCommand::Stats => {
            let stats = admin
                .contact_stats()
                .await
                .map_err(|e| user_error(e, ADMIN_FAILED))?;
            output::print_contact_stats(&stats);
        }
    }
    Ok(())
}
