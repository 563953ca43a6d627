use anyhow::Result;
use bit_rewrite::areas::repository::Repository;
use bit_rewrite::commands::plumbing::show_index;
use bit_rewrite::commands::porcelain::RewriteOptions;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "bit-rewrite",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Rewrite git history in place",
    long_about = "Loads every loose object of a repository into memory, replaces selected blobs \
    (by default: moves large binary files to LFS) and rewrites every tree, commit, tag and ref \
    above them. Objects are content-addressed, so an interrupted run can simply be restarted.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "lfs",
        about = "Move large files to LFS and rewrite history",
        long_about = "This command converts every blob whose file name matches one of the extensions \
        into an LFS pointer, stores the original content under lfs/objects and rewrites the history above it."
    )]
    Lfs {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
        #[arg(long = "ext", help = "Extension to convert (repeatable); defaults to common binary formats")]
        extensions: Vec<String>,
        #[arg(long, help = "Add a .gitattributes entry to every reachable root tree")]
        attributes: bool,
        #[arg(long, help = "Load and report without writing anything")]
        dry_run: bool,
    },
    #[command(
        name = "cat-file",
        about = "Print the content of an object",
        long_about = "This command prints the content of an object in the repository. \
        It requires the SHA of the object to be specified."
    )]
    CatFile {
        #[arg(short = 'p', long, help = "The object SHA to print")]
        sha: String,
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
    #[command(
        name = "ls-tree",
        about = "List the contents of a tree object",
        long_about = "This command lists the entries of a tree, or of the tree of a commit."
    )]
    LsTree {
        #[arg(index = 1, help = "The tree or commit SHA")]
        sha: String,
        #[arg(index = 2, help = "The path to the repository")]
        path: Option<String>,
        #[arg(short, long, help = "Recurse into subtrees")]
        recursive: bool,
    },
    #[command(
        name = "show-index",
        about = "Dump a pack index",
        long_about = "This command prints the offset, id and CRC32 of every object listed in a version 2 pack index."
    )]
    ShowIndex {
        #[arg(index = 1, help = "The .idx file")]
        index: PathBuf,
    },
    #[command(
        name = "verify",
        about = "Check that every reference resolves",
        long_about = "This command loads the repository and lists every tree entry, commit link, tag target \
        or ref that points at a missing object. It fails if there is any."
    )]
    Verify {
        #[arg(index = 1, help = "The path to the repository")]
        path: Option<String>,
    },
}

fn open_repository(path: &Option<String>) -> Result<Repository> {
    let path = match path {
        Some(path) => path.clone(),
        None => std::env::current_dir()?.to_string_lossy().into_owned(),
    };

    Repository::new(&path, Box::new(std::io::stdout()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bit_rewrite=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Lfs {
            path,
            extensions,
            attributes,
            dry_run,
        } => {
            let mut repository = open_repository(path)?;
            let options = RewriteOptions::new(extensions.clone(), *attributes, *dry_run);
            repository.lfs(&options).await?;
        }
        Commands::CatFile { sha, path } => {
            let repository = open_repository(path)?;
            repository.cat_file(sha)?;
        }
        Commands::LsTree { sha, path, recursive } => {
            let repository = open_repository(path)?;
            repository.ls_tree(sha, *recursive)?;
        }
        Commands::ShowIndex { index } => {
            show_index(Path::new(index), &mut std::io::stdout())?;
        }
        Commands::Verify { path } => {
            let mut repository = open_repository(path)?;
            repository.verify().await?;
        }
    }

    Ok(())
}
