use std::{
    io::{stdout, Write},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use lib::{
    config::Config,
    diff::DiffStrategy,
    error::Error,
    model::{FileId, RepoId},
    object_id::ObjectId,
    object_store::directory::DirectoryObjectStore,
    storage::directory::DirectoryStorage,
    vcs::Vcs,
};
use serde::Serialize;

#[derive(Parser, Debug)]
#[clap(about = "a small version control store")]
struct Arguments {
    #[arg(long, default_value = ".minigit", help = "directory holding the store")]
    root: PathBuf,
    #[arg(long, help = "overrides the configured history limit")]
    history_limit: Option<usize>,
    #[arg(long, help = "overrides the configured diff strategy (membership or myers)")]
    diff_strategy: Option<DiffStrategy>,
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[clap(subcommand, about = "manage repositories")]
    Repo(RepoCommand),
    #[clap(subcommand, about = "manage the files of a repository")]
    File(FileCommand),
    #[clap(about = "commit the current files of a repository")]
    Commit {
        repo: String,
        #[arg(short, long, help = "message to leave with this commit")]
        message: String,
        #[arg(short, long)]
        author: Option<String>,
    },
    #[clap(about = "list commits, newest first")]
    Log {
        repo: String,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    #[clap(about = "show one commit")]
    Show { repo: String, hash: ObjectId },
    #[clap(about = "show the commit graph")]
    Graph { repo: String },
    #[clap(about = "compare a file with its content at a commit")]
    Diff {
        repo: String,
        file: String,
        #[arg(long, help = "commit to compare with, the latest if omitted")]
        commit: Option<ObjectId>,
        #[arg(long)]
        strategy: Option<DiffStrategy>,
    },
    #[clap(about = "show what a commit contains, without touching the files")]
    Checkout { repo: String, hash: ObjectId },
}

#[derive(Subcommand, Debug)]
enum RepoCommand {
    Create {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    List,
    Show {
        id: String,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
enum FileCommand {
    #[clap(about = "create a text file, or replace the file with that name")]
    Put {
        repo: String,
        name: String,
        content: String,
    },
    #[clap(about = "replace the content of a file by id")]
    Update {
        repo: String,
        id: String,
        content: String,
    },
    #[clap(about = "store a file from disk")]
    Upload {
        repo: String,
        path: PathBuf,
        #[arg(long, help = "name in the repository, the file name if omitted")]
        name: Option<String>,
        #[arg(long)]
        content_type: Option<String>,
    },
    List {
        repo: String,
    },
    Show {
        repo: String,
        id: String,
    },
    Rm {
        repo: String,
        id: String,
    },
}

#[derive(Serialize)]
struct Message {
    message: String,
}

fn print<A: Serialize>(thing: &A) -> Result<(), Error> {
    let mut out = stdout().lock();
    serde_json::to_writer_pretty(&mut out, thing)?;
    writeln!(out)?;
    Ok(())
}

fn open(args: &Arguments) -> Result<Vcs<DirectoryStorage, DirectoryObjectStore>, Error> {
    let mut config = Config::load(&args.root.join("config.json"))?;
    if let Some(limit) = args.history_limit {
        config.history_limit = limit;
    }
    if let Some(strategy) = args.diff_strategy {
        config.diff_strategy = strategy;
    }
    let storage = DirectoryStorage::new(args.root.clone())?;
    let objects = DirectoryObjectStore::new(args.root.join("objects"))?;
    Ok(Vcs::new(storage, objects, config))
}

fn run(args: Arguments) -> Result<(), Error> {
    let vcs = open(&args)?;
    use Command::*;
    match args.cmd {
        Repo(RepoCommand::Create { name, description }) => {
            print(&vcs.create_repository(&name, &description)?)
        }
        Repo(RepoCommand::List) => print(&vcs.repositories()?),
        Repo(RepoCommand::Show { id }) => print(&vcs.repository(&RepoId::from(id))?),
        Repo(RepoCommand::Delete { id }) => {
            vcs.delete_repository(&RepoId::from(id))?;
            print(&Message {
                message: String::from("Repository deleted successfully"),
            })
        }
        File(FileCommand::Put {
            repo,
            name,
            content,
        }) => print(&vcs.put_file(&RepoId::from(repo), &name, &content)?),
        File(FileCommand::Update { repo, id, content }) => {
            print(&vcs.update_file(&RepoId::from(repo), &FileId::from(id), &content)?)
        }
        File(FileCommand::Upload {
            repo,
            path,
            name,
            content_type,
        }) => {
            let name = match name {
                Some(name) => name,
                None => path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| path.to_string_lossy().into_owned()),
            };
            let bytes = std::fs::read(&path)?;
            print(&vcs.upload_file(&RepoId::from(repo), &name, bytes, content_type.as_deref())?)
        }
        File(FileCommand::List { repo }) => print(&vcs.files(&RepoId::from(repo))?),
        File(FileCommand::Show { repo, id }) => {
            print(&vcs.file(&RepoId::from(repo), &FileId::from(id))?)
        }
        File(FileCommand::Rm { repo, id }) => {
            vcs.delete_file(&RepoId::from(repo), &FileId::from(id))?;
            print(&Message {
                message: String::from("File deleted successfully"),
            })
        }
        Commit {
            repo,
            message,
            author,
        } => print(&vcs.commit(&RepoId::from(repo), &message, author.as_deref())?),
        Log { repo, limit } => print(&vcs.commits(&RepoId::from(repo), limit)?),
        Show { repo, hash } => print(&vcs.commit_by_hash(&RepoId::from(repo), &hash)?),
        Graph { repo } => print(&vcs.graph(&RepoId::from(repo))?),
        Diff {
            repo,
            file,
            commit,
            strategy,
        } => print(&vcs.diff_file(
            &RepoId::from(repo),
            &FileId::from(file),
            commit.as_ref(),
            strategy,
        )?),
        Checkout { repo, hash } => print(&vcs.checkout(&RepoId::from(repo), &hash)?),
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Arguments::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::debug!("{:?}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}
