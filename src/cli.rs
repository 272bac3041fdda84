use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the books linked from a saved catalog page.
    Books(PageArgs),
    /// Print the work record of a saved book page.
    Details(PageArgs),
    /// List the chapters of a saved book page, newest first.
    Chapters(ChaptersArgs),
    /// List the page images of a saved chapter pages response.
    Pages(PagesArgs),
    /// Rank books of a saved search listing against a query.
    Search(SearchArgs),
}

#[derive(Debug, Args)]
pub struct SiteArgs {
    /// YAML site config (homepage, inference policy, languages).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct PageArgs {
    /// Saved HTML document.
    #[arg(long)]
    pub html: PathBuf,

    /// Absolute URL the document was served from.
    #[arg(long)]
    pub url: String,

    #[command(flatten)]
    pub site: SiteArgs,
}

#[derive(Debug, Args)]
pub struct ChaptersArgs {
    #[command(flatten)]
    pub page: PageArgs,

    /// Only keep these languages (plus chapters without a language). Repeatable.
    #[arg(long = "whitelist-lang")]
    pub whitelist_lang: Vec<String>,

    /// Drop these languages. Repeatable.
    #[arg(long = "blacklist-lang")]
    pub blacklist_lang: Vec<String>,
}

#[derive(Debug, Args)]
pub struct PagesArgs {
    /// Saved JSON response of the chapter pages endpoint.
    #[arg(long)]
    pub json: PathBuf,

    #[command(flatten)]
    pub site: SiteArgs,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// Saved JSON response of the book search endpoint.
    #[arg(long)]
    pub json: PathBuf,

    /// Search words, or a book/chapter URL.
    #[arg(long)]
    pub query: String,

    #[command(flatten)]
    pub site: SiteArgs,
}
