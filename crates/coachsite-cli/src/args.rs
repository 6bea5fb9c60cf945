//! Command-line parsing.
//!
//! `coachsite <command> [subcommand] [args] [--flags]`; see [`USAGE`].

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use coachsite_core::api::QueryParams;
use coachsite_core::models::{ContactSubmission, ContactUpdate, ResourceKind};

pub const USAGE: &str = "\
Usage: coachsite <command> [options]

Public content:
  courses|toppers|achievements|gallery [--limit N] [--page N] [--featured] [--json]
  home [--json]
  contact --name NAME --email EMAIL --phone PHONE --subject SUBJECT --message TEXT [--course COURSE]

Session:
  login [EMAIL]
  logout
  whoami
  change-password

Admin:
  admin dashboard
  admin <resource> list
  admin <resource> create key=value... [--file PATH]
  admin <resource> update <id> key=value... [--file PATH]
  admin <resource> delete <id>
  admin contacts list|show <id>|delete <id>|stats
  admin contacts update <id> [status=..] [priority=..] [notes=..]

Configuration:
  config show
  config set-url <url>

<resource> is one of: courses, toppers, achievements, gallery, home
Set RUST_LOG=debug for verbose logging, COACHSITE_LOG_DIR to also log to files.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Content {
        kind: ResourceKind,
        query: QueryParams,
        json: bool,
    },
    Home {
        json: bool,
    },
    Contact(ContactSubmission),
    Login {
        email: Option<String>,
    },
    Logout,
    Whoami,
    ChangePassword,
    Admin(AdminCommand),
    Config(ConfigCommand),
    Help,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminCommand {
    Dashboard,
    List(ResourceKind),
    Create {
        kind: ResourceKind,
        fields: Vec<(String, String)>,
        file: Option<PathBuf>,
    },
    Update {
        kind: ResourceKind,
        key: String,
        fields: Vec<(String, String)>,
        file: Option<PathBuf>,
    },
    Delete {
        kind: ResourceKind,
        key: String,
    },
    Contacts(ContactCommand),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContactCommand {
    List,
    Show(String),
    Update { id: String, update: ContactUpdate },
    Delete(String),
    Stats,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    Show,
    SetUrl(String),
}

impl Command {
    /// The page this command stands for. The client's 401 policy looks at
    /// it to decide whether to send the user back to the login page.
    pub fn route(&self) -> String {
        match self {
            Command::Content { kind, .. } => kind.endpoint().to_string(),
            Command::Home { .. } | Command::Help | Command::Config(_) => "/".to_string(),
            Command::Contact(_) => "/contact".to_string(),
            Command::Login { .. } => "/admin/login".to_string(),
            Command::Logout | Command::Whoami => "/admin".to_string(),
            Command::ChangePassword => "/admin/settings".to_string(),
            Command::Admin(AdminCommand::Dashboard) => "/admin/dashboard".to_string(),
            Command::Admin(AdminCommand::Contacts(_)) => "/admin/contacts".to_string(),
            Command::Admin(
                AdminCommand::List(kind)
                | AdminCommand::Create { kind, .. }
                | AdminCommand::Update { kind, .. }
                | AdminCommand::Delete { kind, .. },
            ) => format!("/admin{}", kind.endpoint()),
        }
    }

    pub fn needs_admin(&self) -> bool {
        matches!(
            self,
            Command::Admin(_) | Command::ChangePassword | Command::Whoami
        )
    }
}

/// Parse everything after the program name.
pub fn parse(args: &[String]) -> Result<Command> {
    let Some((first, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match first.as_str() {
        "help" | "--help" | "-h" => Ok(Command::Help),
        "courses" | "toppers" | "achievements" | "gallery" => {
            let kind: ResourceKind = first.parse().map_err(anyhow::Error::msg)?;
            parse_content(kind, rest)
        }
        "home" => {
            let mut json = false;
            for arg in rest {
                match arg.as_str() {
                    "--json" => json = true,
                    other => bail!("Unexpected argument for home: {}", other),
                }
            }
            Ok(Command::Home { json })
        }
        "contact" => parse_contact(rest),
        "login" => match rest {
            [] => Ok(Command::Login { email: None }),
            [email] => Ok(Command::Login {
                email: Some(email.clone()),
            }),
            _ => bail!("Usage: coachsite login [EMAIL]"),
        },
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::Whoami),
        "change-password" => Ok(Command::ChangePassword),
        "admin" => parse_admin(rest).map(Command::Admin),
        "config" => match rest {
            [cmd] if cmd == "show" => Ok(Command::Config(ConfigCommand::Show)),
            [cmd, url] if cmd == "set-url" => Ok(Command::Config(ConfigCommand::SetUrl(url.clone()))),
            _ => bail!("Usage: coachsite config show | config set-url <url>"),
        },
        other => bail!("Unknown command: {}\n\n{}", other, USAGE),
    }
}

fn value_of<'a>(flag: &str, iter: &mut impl Iterator<Item = &'a String>) -> Result<String> {
    iter.next()
        .cloned()
        .with_context(|| format!("{} needs a value", flag))
}

fn parse_content(kind: ResourceKind, rest: &[String]) -> Result<Command> {
    let mut query = QueryParams::new();
    let mut json = false;
    let mut iter = rest.iter();

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--limit" => {
                let limit = value_of(arg, &mut iter)?
                    .parse()
                    .context("--limit must be a number")?;
                query = query.limit(limit);
            }
            "--page" => {
                let page = value_of(arg, &mut iter)?
                    .parse()
                    .context("--page must be a number")?;
                query = query.page(page);
            }
            "--featured" => query = query.featured(true),
            "--json" => json = true,
            other => bail!("Unexpected argument for {}: {}", kind, other),
        }
    }
    Ok(Command::Content { kind, query, json })
}

fn parse_contact(rest: &[String]) -> Result<Command> {
    let mut submission = ContactSubmission::default();
    let mut iter = rest.iter();

    while let Some(arg) = iter.next() {
        let value = value_of(arg, &mut iter)?;
        match arg.as_str() {
            "--name" => submission.name = value,
            "--email" => submission.email = value,
            "--phone" => submission.phone = value,
            "--subject" => submission.subject = value,
            "--message" => submission.message = value,
            "--course" => submission.course = Some(value),
            other => bail!("Unexpected argument for contact: {}", other),
        }
    }

    let missing: Vec<&str> = [
        ("--name", &submission.name),
        ("--email", &submission.email),
        ("--phone", &submission.phone),
        ("--subject", &submission.subject),
        ("--message", &submission.message),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(flag, _)| flag)
    .collect();
    if !missing.is_empty() {
        bail!("Missing {}", missing.join(", "));
    }
    Ok(Command::Contact(submission))
}

/// `key=value` pairs plus an optional `--file PATH`.
fn parse_fields(rest: &[String]) -> Result<(Vec<(String, String)>, Option<PathBuf>)> {
    let mut fields = Vec::new();
    let mut file = None;
    let mut iter = rest.iter();

    while let Some(arg) = iter.next() {
        if arg == "--file" {
            file = Some(PathBuf::from(value_of(arg, &mut iter)?));
        } else if let Some((key, value)) = arg.split_once('=') {
            if key.is_empty() {
                bail!("Empty field name in {:?}", arg);
            }
            fields.push((key.to_string(), value.to_string()));
        } else {
            bail!("Expected key=value, got {:?}", arg);
        }
    }
    Ok((fields, file))
}

fn parse_admin(rest: &[String]) -> Result<AdminCommand> {
    match rest {
        [cmd] if cmd == "dashboard" => Ok(AdminCommand::Dashboard),
        [target, tail @ ..] if target == "contacts" || target == "contact" => {
            parse_contacts(tail).map(AdminCommand::Contacts)
        }
        [target, action, tail @ ..] => {
            let kind: ResourceKind = target.parse().map_err(anyhow::Error::msg)?;
            match (action.as_str(), tail) {
                ("list", []) => Ok(AdminCommand::List(kind)),
                ("create", fields) => {
                    let (fields, file) = parse_fields(fields)?;
                    Ok(AdminCommand::Create { kind, fields, file })
                }
                ("update", [key, fields @ ..]) => {
                    let (fields, file) = parse_fields(fields)?;
                    Ok(AdminCommand::Update {
                        kind,
                        key: key.clone(),
                        fields,
                        file,
                    })
                }
                ("delete", [key]) => Ok(AdminCommand::Delete {
                    kind,
                    key: key.clone(),
                }),
                _ => bail!("Usage: coachsite admin {} list|create|update <id>|delete <id>", kind),
            }
        }
        _ => bail!("Usage: coachsite admin dashboard | admin <resource> <action> | admin contacts <action>"),
    }
}

fn parse_contacts(rest: &[String]) -> Result<ContactCommand> {
    match rest {
        [cmd] if cmd == "list" => Ok(ContactCommand::List),
        [cmd] if cmd == "stats" => Ok(ContactCommand::Stats),
        [cmd, id] if cmd == "show" => Ok(ContactCommand::Show(id.clone())),
        [cmd, id] if cmd == "delete" => Ok(ContactCommand::Delete(id.clone())),
        [cmd, id, fields @ ..] if cmd == "update" => {
            let mut update = ContactUpdate::default();
            let (pairs, file) = parse_fields(fields)?;
            if file.is_some() {
                bail!("Contacts do not take attachments");
            }
            for (key, value) in pairs {
                match key.as_str() {
                    "status" => update.status = Some(value.parse().map_err(anyhow::Error::msg)?),
                    "priority" => {
                        update.priority = Some(value.parse().map_err(anyhow::Error::msg)?)
                    }
                    "notes" | "adminNotes" => update.admin_notes = Some(value),
                    other => bail!("Unknown contact field: {}", other),
                }
            }
            Ok(ContactCommand::Update {
                id: id.clone(),
                update,
            })
        }
        _ => bail!("Usage: coachsite admin contacts list|show <id>|update <id> ..|delete <id>|stats"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coachsite_core::models::{ContactPriority, ContactStatus};

    fn args(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_no_args_is_help() {
        assert_eq!(parse(&[]).unwrap(), Command::Help);
    }

    #[test]
    fn test_parse_content_query() {
        let cmd = parse(&args("courses --limit 50 --featured")).unwrap();
        match &cmd {
            Command::Content { kind, query, json } => {
                assert_eq!(*kind, ResourceKind::Courses);
                assert_eq!(query.to_query_string(), "limit=50&featured=true");
                assert!(!json);
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(cmd.route(), "/courses");
        assert!(!cmd.needs_admin());
    }

    #[test]
    fn test_parse_content_rejects_bad_limit() {
        assert!(parse(&args("toppers --limit many")).is_err());
        assert!(parse(&args("gallery --limit")).is_err());
    }

    #[test]
    fn test_parse_contact_requires_fields() {
        let err = parse(&args("contact --name Priya --email p@example.com")).unwrap_err();
        assert!(err.to_string().contains("--phone"));

        let cmd = parse(&args(
            "contact --name Priya --email p@example.com --phone 9876543210 --subject Fees --message Hello --course JEE",
        ))
        .unwrap();
        match cmd {
            Command::Contact(s) => {
                assert_eq!(s.course.as_deref(), Some("JEE"));
                assert_eq!(s.subject, "Fees");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_admin_crud() {
        let cmd = parse(&args("admin toppers create name=Arjun rank=15 --file arjun.jpg")).unwrap();
        assert_eq!(
            cmd,
            Command::Admin(AdminCommand::Create {
                kind: ResourceKind::Toppers,
                fields: vec![
                    ("name".into(), "Arjun".into()),
                    ("rank".into(), "15".into())
                ],
                file: Some(PathBuf::from("arjun.jpg")),
            })
        );
        assert_eq!(cmd.route(), "/admin/toppers");
        assert!(cmd.needs_admin());

        let cmd = parse(&args("admin home delete hero")).unwrap();
        assert_eq!(
            cmd,
            Command::Admin(AdminCommand::Delete {
                kind: ResourceKind::Home,
                key: "hero".into(),
            })
        );
        assert!(parse(&args("admin courses create title")).is_err());
        assert!(parse(&args("admin blog list")).is_err());
    }

    #[test]
    fn test_parse_contact_update() {
        let cmd = parse(&args(
            "admin contacts update m1 status=in-progress priority=high notes=Called",
        ))
        .unwrap();
        assert_eq!(
            cmd,
            Command::Admin(AdminCommand::Contacts(ContactCommand::Update {
                id: "m1".into(),
                update: ContactUpdate {
                    status: Some(ContactStatus::InProgress),
                    priority: Some(ContactPriority::High),
                    admin_notes: Some("Called".into()),
                },
            }))
        );
        assert_eq!(cmd.route(), "/admin/contacts");
    }

    #[test]
    fn test_parse_config_and_session() {
        assert_eq!(
            parse(&args("config set-url https://api.example.edu/api")).unwrap(),
            Command::Config(ConfigCommand::SetUrl("https://api.example.edu/api".into()))
        );
        assert_eq!(
            parse(&args("login admin@example.edu")).unwrap(),
            Command::Login {
                email: Some("admin@example.edu".into())
            }
        );
        assert_eq!(parse(&args("login")).unwrap().route(), "/admin/login");
        assert!(parse(&args("frobnicate")).is_err());
    }
}
