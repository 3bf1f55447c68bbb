mod session;


use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use clap::{Args, Parser, Subcommand};
use client::net::error::{ApiError, LoginError};
use client::net::types::{Article, ArticleStatus};
use client::pages::admin::{ArticleDraft, ArticleFieldError, validate_article_form};
use client::pages::login::return_url;
use client::util::storage::FileStorage;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use crate::session::Session;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("login required: the site would send you to {location}; run `blog-cli login --from '{from}'`")]
    LoginRequired { location: String, from: String },
    #[error("session state unavailable")]
    SessionUnavailable,
    #[error("your session has expired; sign in again with `blog-cli login`")]
    SessionExpired,
    #[error("{0}")]
    Login(#[from] LoginError),
    #[error("invalid article: {0}")]
    Article(#[from] ArticleFieldError),
    #[error("{0}")]
    Api(ApiError),
    #[error("no state directory available; pass --state-file or set BLOG_STATE_FILE")]
    NoStateDir,
    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "blog-cli", about = "Blog reader and admin client")]
struct Cli {
    #[arg(long, env = "BLOG_API_URL", default_value = "http://localhost:3001")]
    api_url: String,

    /// Credential file; defaults to the platform data directory.
    #[arg(long, env = "BLOG_STATE_FILE")]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        #[arg(long, short)]
        user: String,
        #[arg(long, env = "BLOG_PASSWORD", hide_env_values = true)]
        password: String,
        /// Page to continue at after signing in.
        #[arg(long)]
        from: Option<String>,
    },
    /// Sign out and clear the persisted session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    Articles(ArticlesCommand),
    Categories,
    /// List showcased GitHub repositories.
    Projects,
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct ArticlesCommand {
    #[command(subcommand)]
    command: ArticlesSubcommand,
}

#[derive(Subcommand, Debug)]
enum ArticlesSubcommand {
    List,
    Show { id: i64 },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    /// List all articles, drafts included.
    Articles {
        #[arg(long, value_parser = ["draft", "published"])]
        status: Option<String>,
    },
    Create(CreateArgs),
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    title: String,
    #[arg(long, conflicts_with = "content_file", required_unless_present = "content_file")]
    content: Option<String>,
    #[arg(long)]
    content_file: Option<PathBuf>,
    #[arg(long, default_value = "")]
    excerpt: String,
    #[arg(long)]
    category_id: i64,
    #[arg(long, default_value = "draft")]
    status: ArticleStatus,
    /// Comma-separated tags.
    #[arg(long, default_value = "")]
    tags: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let result = run(Cli::parse()).await;
    report(result, &mut std::io::stderr())
}

/// Print a failed command's message and map the outcome to an exit code.
fn report(result: Result<(), CliError>, out: &mut impl Write) -> ExitCode {
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = writeln!(out, "error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let state_file = match cli.state_file {
        Some(path) => path,
        None => default_state_file().ok_or(CliError::NoStateDir)?,
    };
    tracing::debug!(state_file = %state_file.display(), api_url = %cli.api_url, "opening session");
    let mut session = Session::open(Rc::new(FileStorage::new(state_file)), &cli.api_url);

    match cli.command {
        Command::Login { user, password, from } => run_login(&mut session, &user, &password, from.as_deref()).await,
        Command::Logout => {
            session.logout();
            println!("signed out");
            Ok(())
        }
        Command::Whoami => {
            match session.user() {
                Some(user) => print_json(&user)?,
                None => println!("not signed in"),
            }
            Ok(())
        }
        Command::Articles(articles) => run_articles(&mut session, articles).await,
        Command::Categories => {
            let result = session.api().list_categories().await;
            let categories = result.map_err(|e| session.api_error(e))?;
            for category in categories {
                println!("{}\t{}\t{}", category.id, category.slug, category.name);
            }
            Ok(())
        }
        Command::Projects => {
            let result = session.api().list_repositories().await;
            let repositories = result.map_err(|e| session.api_error(e))?;
            for repo in repositories {
                println!(
                    "{}\t★{}\t{}\t{}",
                    repo.name,
                    repo.stargazers_count,
                    repo.language.as_deref().unwrap_or("-"),
                    repo.html_url
                );
            }
            Ok(())
        }
        Command::Admin(admin) => run_admin(&mut session, admin).await,
    }
}

fn default_state_file() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "blog-cli").map(|dirs| dirs.data_dir().join("session.json"))
}

async fn run_login(session: &mut Session, user: &str, password: &str, from: Option<&str>) -> Result<(), CliError> {
    if let Some(current) = session.user() {
        // Mirrors the site: an already signed-in visit to login goes straight on.
        println!("already signed in as {}; continue at {}", current.username, return_url(from));
        return Ok(());
    }
    let user = session.login(user, password).await?;
    println!("signed in as {}; continue at {}", user.username, return_url(from));
    Ok(())
}

async fn run_articles(session: &mut Session, articles: ArticlesCommand) -> Result<(), CliError> {
    match articles.command {
        ArticlesSubcommand::List => {
            let result = session.api().list_articles().await;
            let page = result.map_err(|e| session.api_error(e))?;
            for article in &page.articles {
                print_article_line(article);
            }
            Ok(())
        }
        ArticlesSubcommand::Show { id } => {
            let result = session.api().get_article(id).await;
            let article = result.map_err(|e| session.api_error(e))?;
            print_json(&article)
        }
    }
}

async fn run_admin(session: &mut Session, admin: AdminCommand) -> Result<(), CliError> {
    match admin.command {
        AdminSubcommand::Articles { status } => {
            let query = status.as_deref().map(|s| format!("status={s}")).unwrap_or_default();
            session.require_login("/admin/articles", &query)?;
            let result = session.api().list_articles().await;
            let page = result.map_err(|e| session.api_error(e))?;
            let wanted = status.as_deref().map(str::parse::<ArticleStatus>).transpose().ok().flatten();
            let mut shown = 0usize;
            for article in page.articles.iter().filter(|a| wanted.is_none_or(|s| a.status == s)) {
                print_article_line(article);
                shown += 1;
            }
            let published = page.articles.iter().filter(|a| a.status == ArticleStatus::Published).count();
            println!("{shown} shown, {published} published, {} drafts", page.articles.len() - published);
            Ok(())
        }
        AdminSubcommand::Create(args) => {
            session.require_login("/admin/create-article", "")?;
            let content = match (args.content, args.content_file) {
                (Some(content), _) => content,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| CliError::ReadFile { path, source })?,
                (None, None) => String::new(),
            };
            let body = validate_article_form(&ArticleDraft {
                title: args.title,
                excerpt: args.excerpt,
                content,
                category_id: args.category_id,
                status: args.status,
                tags: args.tags,
            })?;
            let result = session.api().create_article(&body).await;
            let article = result.map_err(|e| session.api_error(e))?;
            println!("created article {} at /articles/{}", article.slug, article.id);
            Ok(())
        }
        AdminSubcommand::Delete { id } => {
            session.require_login("/admin/articles", "")?;
            let result = session.api().delete_article(id).await;
            result.map_err(|e| session.api_error(e))?;
            println!("deleted article {id}");
            Ok(())
        }
    }
}

fn print_article_line(article: &Article) {
    println!(
        "{}\t{}\t{}\t{}\t{} views",
        article.id,
        article.status.as_str(),
        article.category.name,
        article.title,
        article.view_count
    );
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
