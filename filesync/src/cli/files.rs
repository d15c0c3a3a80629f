use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use client::FileList;
use kernel::{Credentials, Registration};

use super::Session;

fn print_files(list: &FileList) {
    let files = list.items();
    if files.is_empty() {
        println!("No files uploaded yet.");
    } else {
        println!("{}", client::files_table(&files));
    }
}

pub async fn login(session: &Session, email: &str, password: &str) -> Result<()> {
    let credentials = Credentials {
        email: email.to_string(),
        password: password.to_string(),
    };
    let token = session.store()?.login(&credentials).await?;
    match session.config.token_file() {
        Some(file) => {
            file.save(&token)
                .with_context(|| format!("cannot save token to {}", file.path().display()))?;
            println!("Token saved to {}", file.path().display());
        }
        None => tracing::warn!("no config directory, token not saved"),
    }
    println!("{token}");
    Ok(())
}

pub fn logout(session: &Session) -> Result<()> {
    let Some(file) = session.config.token_file() else {
        println!("No saved token");
        return Ok(());
    };
    let removed = file
        .clear()
        .with_context(|| format!("cannot remove {}", file.path().display()))?;
    if removed {
        println!("Removed saved token {}", file.path().display());
    } else {
        println!("No saved token");
    }
    Ok(())
}

pub async fn register(session: &Session, email: &str, password: &str, confirm: &str) -> Result<()> {
    let registration = Registration {
        email: email.to_string(),
        password: password.to_string(),
        confirm_password: confirm.to_string(),
    };
    session.store()?.register(&registration).await?;
    println!("Account {email} created. Sign in with `login`.");
    Ok(())
}

pub async fn list(session: &Session) -> Result<()> {
    let list = session.open().await?;
    print_files(&list);
    Ok(())
}

pub async fn upload(session: &Session, files: Vec<PathBuf>, tags: Vec<String>) -> Result<()> {
    let list = session.open().await?;
    list.upload(&files, &tags).await?;
    println!("{} file(s) uploaded successfully", files.len());
    print_files(&list);
    Ok(())
}

pub async fn add_tag(session: &Session, filename: &str, tag: &str) -> Result<()> {
    let list = session.open().await?;
    list.add_tag(filename, tag).await?;
    print_files(&list);
    Ok(())
}

pub async fn remove_tag(session: &Session, filename: &str, tag: &str) -> Result<()> {
    let list = session.open().await?;
    list.remove_tag(filename, tag).await?;
    print_files(&list);
    Ok(())
}

pub async fn delete(session: &Session, filename: &str, confirmed: bool) -> Result<()> {
    if !confirmed && !confirm(&format!("Are you sure you want to delete {filename}?"))? {
        println!("Nothing deleted");
        return Ok(());
    }
    let list = session.open().await?;
    list.delete(filename).await?;
    print_files(&list);
    Ok(())
}

pub async fn share(session: &Session, id: &str) -> Result<()> {
    let list = session.open().await?;
    if let Some(link) = list.find_by_id(id).and_then(|r| r.shared_link) {
        println!("Already shared: {link}");
        return Ok(());
    }
    let link = list.generate_link(id).await?;
    println!("Shareable Link: {link}");
    Ok(())
}

pub async fn move_file(session: &Session, moved: &str, target: &str) -> Result<()> {
    let list = session.open().await?;
    match list.reorder(moved, target)? {
        Some(sync) => {
            tracing::debug!("waiting for order persist {}", sync.generation());
            sync.wait().await?;
        }
        None => {
            if list.find_by_id(moved).is_none() || list.find_by_id(target).is_none() {
                bail!("both {moved} and {target} must be ids of your files");
            }
        }
    }
    print_files(&list);
    Ok(())
}

pub async fn view(session: &Session, shared_id: &str) -> Result<()> {
    let store = session.store()?;
    let url = client::resolve_shared_file(&store, shared_id).await?;
    println!("{url}");
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
