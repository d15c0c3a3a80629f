use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{arg, command, crate_name, Arg, ArgAction, ArgMatches, Command};
use cli::Session;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

const DEFAULT_LOG_FILTER: &str = "filesync=warn,client=warn";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = build_cli().get_matches();
    if let Err(e) = run(&cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn build_cli() -> Command {
    let name_arg = || arg!(-n --name <NAME>).required(true).help("File name");
    let tag_arg = || arg!(-t --tag <TAG>).required(true).help("Tag");

    command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .arg(
            arg!(-u --uri <URI>)
                .global(true)
                .help("API base URI (defaults to FILESYNC_API_URI)"),
        )
        .arg(
            arg!(--token <TOKEN>)
                .global(true)
                .help("Bearer token (defaults to FILESYNC_TOKEN)"),
        )
        .arg(
            Arg::new("rollback")
                .long("rollback")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Restore the saved order when saving a new order fails"),
        )
        .arg(
            Arg::new("reload-after-share")
                .long("reload-after-share")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Reload the whole list after generating a link"),
        )
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(
            Command::new(cli::LOGIN_SUBCOMMAND)
                .about(cli::LOGIN_DESCRIPTION)
                .arg(arg!(-e --email <EMAIL>).required(true).help("Account email"))
                .arg(arg!(-p --password <PASSWORD>).required(true).help("Account password")),
        )
        .subcommand(Command::new(cli::LOGOUT_SUBCOMMAND).about(cli::LOGOUT_DESCRIPTION))
        .subcommand(
            Command::new(cli::REGISTER_SUBCOMMAND)
                .about(cli::REGISTER_DESCRIPTION)
                .arg(arg!(-e --email <EMAIL>).required(true).help("Account email"))
                .arg(arg!(-p --password <PASSWORD>).required(true).help("Account password"))
                .arg(
                    arg!(-c --confirm <PASSWORD>)
                        .required(true)
                        .help("Password once more"),
                ),
        )
        .subcommand(Command::new(cli::LIST_SUBCOMMAND).about(cli::LIST_DESCRIPTION))
        .subcommand(
            Command::new(cli::UPLOAD_SUBCOMMAND)
                .about(cli::UPLOAD_DESCRIPTION)
                .arg(
                    arg!(-f --file <FILE>)
                        .required(true)
                        .action(ArgAction::Append)
                        .help("Path to file to upload, may be repeated"),
                )
                .arg(
                    arg!(-t --tag <TAG>)
                        .action(ArgAction::Append)
                        .help("Tag to attach to every uploaded file, may be repeated"),
                ),
        )
        .subcommand(
            Command::new(cli::TAG_SUBCOMMAND)
                .about(cli::TAG_DESCRIPTION)
                .subcommand_required(true)
                .subcommand(
                    Command::new(cli::TAG_ADD_SUBCOMMAND)
                        .about(cli::TAG_ADD_DESCRIPTION)
                        .arg(name_arg())
                        .arg(tag_arg()),
                )
                .subcommand(
                    Command::new(cli::TAG_REMOVE_SUBCOMMAND)
                        .about(cli::TAG_REMOVE_DESCRIPTION)
                        .arg(name_arg())
                        .arg(tag_arg()),
                ),
        )
        .subcommand(
            Command::new(cli::DELETE_SUBCOMMAND)
                .about(cli::DELETE_DESCRIPTION)
                .arg(name_arg())
                .arg(arg!(-y --yes "Do not ask for confirmation")),
        )
        .subcommand(
            Command::new(cli::SHARE_SUBCOMMAND)
                .about(cli::SHARE_DESCRIPTION)
                .arg(arg!(-i --id <ID>).required(true).help("File id")),
        )
        .subcommand(
            Command::new(cli::MOVE_SUBCOMMAND)
                .about(cli::MOVE_DESCRIPTION)
                .arg(arg!(-i --id <ID>).required(true).help("Id of the file to move"))
                .arg(
                    arg!(--onto <ID>)
                        .required(true)
                        .help("Id of the file whose position it takes"),
                ),
        )
        .subcommand(
            Command::new(cli::VIEW_SUBCOMMAND)
                .about(cli::VIEW_DESCRIPTION)
                .arg(arg!(<SHARED_ID> "Public share id")),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
}

fn value<'a>(matches: &'a ArgMatches, id: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing --{id}"))
}

fn values(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

async fn run(cli: &ArgMatches) -> Result<()> {
    let session = Session::new(cli);
    match cli.subcommand() {
        Some((cli::VERSION_SUBCOMMAND, _)) => cli::version::run(),
        Some((cli::BUGREPORT_SUBCOMMAND, _)) => cli::bugreport::run(),
        Some((cli::LOGIN_SUBCOMMAND, m)) => {
            cli::files::login(&session, value(m, "email")?, value(m, "password")?).await?;
        }
        Some((cli::LOGOUT_SUBCOMMAND, _)) => cli::files::logout(&session)?,
        Some((cli::REGISTER_SUBCOMMAND, m)) => {
            cli::files::register(
                &session,
                value(m, "email")?,
                value(m, "password")?,
                value(m, "confirm")?,
            )
            .await?;
        }
        Some((cli::LIST_SUBCOMMAND, _)) => cli::files::list(&session).await?,
        Some((cli::UPLOAD_SUBCOMMAND, m)) => {
            let files = values(m, "file").into_iter().map(PathBuf::from).collect();
            cli::files::upload(&session, files, values(m, "tag")).await?;
        }
        Some((cli::TAG_SUBCOMMAND, m)) => match m.subcommand() {
            Some((cli::TAG_ADD_SUBCOMMAND, t)) => {
                cli::files::add_tag(&session, value(t, "name")?, value(t, "tag")?).await?;
            }
            Some((cli::TAG_REMOVE_SUBCOMMAND, t)) => {
                cli::files::remove_tag(&session, value(t, "name")?, value(t, "tag")?).await?;
            }
            _ => {}
        },
        Some((cli::DELETE_SUBCOMMAND, m)) => {
            cli::files::delete(&session, value(m, "name")?, m.get_flag("yes")).await?;
        }
        Some((cli::SHARE_SUBCOMMAND, m)) => cli::files::share(&session, value(m, "id")?).await?,
        Some((cli::MOVE_SUBCOMMAND, m)) => {
            cli::files::move_file(&session, value(m, "id")?, value(m, "onto")?).await?;
        }
        Some((cli::VIEW_SUBCOMMAND, m)) => {
            cli::files::view(&session, value(m, "SHARED_ID")?).await?;
        }
        _ => {}
    }
    Ok(())
}
