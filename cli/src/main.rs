#![warn(clippy::nursery, clippy::pedantic)]
#![deny(unsafe_code)]

// Fadebin CLI Client
// Copyright (C) 2024  Fadebin contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use atty::Stream;
use clap::Parser;
use fadebin_common::{
    api_url, CreatePasteRequest, CreatedPaste, Envelope, FetchedPaste, HealthReport, Number,
    ShareLink, Url,
};
use reqwest::blocking::{Client, Response};

#[derive(Parser)]
struct Opts {
    #[clap(subcommand)]
    action: Action,
}

#[derive(Parser)]
enum Action {
    /// Create a paste from a file, or from stdin if no path is given.
    Create {
        /// The Fadebin instance to upload data to.
        url: Url,
        #[clap(short, long)]
        title: Option<String>,
        /// Hours until the paste expires.
        #[clap(short, long)]
        expires_in: Option<i64>,
        /// Number of views before the paste is deleted.
        #[clap(short, long)]
        max_views: Option<i64>,
        path: Option<PathBuf>,
    },
    /// Fetch a paste, consuming one of its views.
    Fetch {
        /// The Fadebin instance holding the paste, or a share link if no id
        /// is given.
        url: Url,
        /// The paste id.
        id: Option<String>,
    },
    /// Check whether an instance and its database are up.
    Health { url: Url },
}

fn main() -> Result<()> {
    let opts = Opts::parse();

    match opts.action {
        Action::Create {
            url,
            title,
            expires_in,
            max_views,
            path,
        } => handle_create(
            url,
            CreatePasteRequest {
                content: read_content(path)?,
                title,
                expires_in: expires_in.map(Number::from),
                max_views: max_views.map(Number::from),
            },
        ),
        Action::Fetch { url, id } => handle_fetch(paste_url(url, id)?),
        Action::Health { url } => handle_health(url),
    }?;

    Ok(())
}

fn read_content(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            if atty::is(Stream::Stdin) {
                bail!("No input. Pass a file or pipe content to stdin.");
            }
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            Ok(content)
        }
    }
}

/// Resolves the API location of a paste from either a server and an id, or a
/// share link.
fn paste_url(url: Url, id: Option<String>) -> Result<Url> {
    match id {
        Some(id) if !id.is_empty() => Ok(api_url(&url, &format!("pastes/{id}"))),
        Some(_) => bail!("Paste id cannot be empty"),
        None => {
            let link: ShareLink = url
                .as_str()
                .parse()
                .context("Expected a share link or a server url and an id")?;
            Ok(link.api_url())
        }
    }
}

fn unwrap_envelope<T: serde::de::DeserializeOwned>(res: Response) -> Result<T> {
    let status = res.status();
    let envelope: Envelope<T> = res
        .json()
        .with_context(|| format!("Got unexpected response from server: {status}"))?;
    envelope
        .into_result()
        .map_err(|e| anyhow!("Request failed ({status}): {e}"))
}

fn handle_create(url: Url, request: CreatePasteRequest) -> Result<()> {
    let res = Client::new()
        .post(api_url(&url, "pastes"))
        // The server builds share links from the origin it was reached at.
        .header(reqwest::header::ORIGIN, url.origin().ascii_serialization())
        .json(&request)
        .send()
        .context("Request to server failed")?;

    let created: CreatedPaste = unwrap_envelope(res)?;
    println!("{}", created.url);
    if let Some(expires_at) = created.expires_at {
        eprintln!(
            "{}",
            expires_at.format("This paste will expire on %A, %B %-d, %Y at %T %Z.")
        );
    }

    Ok(())
}

fn handle_fetch(url: Url) -> Result<()> {
    let res = Client::new()
        .get(url)
        .send()
        .context("Failed to get data")?;

    let paste: FetchedPaste = unwrap_envelope(res)?;

    if atty::is(Stream::Stderr) {
        eprintln!("# {}", paste.title);
    }
    std::io::stdout().write_all(paste.content.as_bytes())?;
    eprintln!("{}", paste.lifetime_notice());

    Ok(())
}

fn handle_health(url: Url) -> Result<()> {
    let res = Client::new()
        .get(api_url(&url, "health"))
        .send()
        .context("Request to server failed")?;

    let report: HealthReport = res.json().context("Got unexpected response from server")?;
    if !report.success {
        bail!(
            "Server is {}: {}",
            report.status,
            report.error.as_deref().unwrap_or("unknown error")
        );
    }

    println!(
        "{} (database {})",
        report.status,
        report.database.as_deref().unwrap_or("unknown")
    );
    Ok(())
}
