//! Group management. Groups have no web form; they are created here.
//!
//! ```text
//! yatube-groups add <slug> <title> [description]
//! yatube-groups list
//! ```

use anyhow::{Result, bail};
use tracing::info;

use yatube_db::Database;
use yatube_server::config;

fn usage() -> ! {
    eprintln!("usage: yatube-groups add <slug> <title> [description]");
    eprintln!("       yatube-groups list");
    std::process::exit(2);
}

fn valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "yatube_groups=info,yatube_db=warn".into()),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let db = Database::open(&config::db_path())?;

    match args.first().map(String::as_str) {
        Some("add") => {
            let (Some(slug), Some(title)) = (args.get(1), args.get(2)) else {
                usage();
            };
            if !valid_slug(slug) {
                bail!("slug may contain only letters, digits, '-' and '_': {:?}", slug);
            }
            if db.get_group_by_slug(slug)?.is_some() {
                bail!("group {:?} already exists", slug);
            }
            let description = args.get(3).map(String::as_str).unwrap_or_default();
            let id = db.create_group(title, slug, description)?;
            info!("Created group {} ({})", slug, id);
            println!("{}\t{}\t{}", id, slug, title);
        }
        Some("list") => {
            for group in db.list_groups()? {
                println!("{}\t{}\t{}", group.id, group.slug, group.title);
            }
        }
        _ => usage(),
    }

    Ok(())
}
