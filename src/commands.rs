use std::fs;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use anyhow::Context as _;
use scraper::Html;
use serde::Serialize;

use crate::catalog;
use crate::cli::{ChaptersArgs, PageArgs, PagesArgs, SearchArgs, SiteArgs};
use crate::config::{LanguageFilter, SiteConfig};
use crate::error::ExtractError;
use crate::formats::SearchHitRecord;
use crate::pages;
use crate::search;
use crate::session::Extractor;

const DRIFT_HINT: &str =
    "the site structure has likely changed and the extraction heuristics need updating";

fn load_config(args: &SiteArgs) -> anyhow::Result<SiteConfig> {
    SiteConfig::load_or_default(args.config.as_deref()).context("load site config")
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("read input: {}", path.display()))
}

fn extracted<T>(result: Result<T, ExtractError>, what: &str) -> anyhow::Result<T> {
    result.with_context(|| format!("{what} ({DRIFT_HINT})"))
}

fn write_json_lines<T: Serialize>(records: impl IntoIterator<Item = T>) -> anyhow::Result<usize> {
    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut count = 0;
    for record in records {
        serde_json::to_writer(&mut out, &record).context("serialize output record")?;
        out.write_all(b"\n").context("write output newline")?;
        count += 1;
    }
    out.flush().context("flush output")?;
    Ok(count)
}

fn with_document<T>(
    args: &PageArgs,
    config: &SiteConfig,
    f: impl FnOnce(&Extractor<'_>) -> anyhow::Result<T>,
) -> anyhow::Result<T> {
    let raw = read_input(&args.html)?;
    let document = Html::parse_document(&raw);
    let site = config.site();
    let session = Extractor::new(&document, &args.url, &site)
        .context("open extraction session")?
        .with_policy(config.inference);
    f(&session)
}

pub fn books(args: PageArgs) -> anyhow::Result<()> {
    let config = load_config(&args.site)?;
    let records = with_document(&args, &config, |session| {
        let books = extracted(session.books(), "extract books")?;
        Ok(books.iter().map(catalog::book_record).collect::<Vec<_>>())
    })?;

    let count = write_json_lines(records)?;
    let has_next_page = catalog::has_next_page(count);
    tracing::info!(count, has_next_page, url = %args.url, "wrote books");
    Ok(())
}

pub fn details(args: PageArgs) -> anyhow::Result<()> {
    let config = load_config(&args.site)?;
    let work = with_document(&args, &config, |session| {
        let details = extracted(session.details(), "extract book details")?;
        extracted(catalog::work_record(details, session.site()), "build work record")
    })?;

    write_json_lines([work])?;
    tracing::info!(url = %args.url, "wrote work record");
    Ok(())
}

pub fn chapters(args: ChaptersArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.page.site)?;
    if !args.whitelist_lang.is_empty() {
        config.languages.whitelist = args.whitelist_lang;
    }
    if !args.blacklist_lang.is_empty() {
        config.languages.blacklist = args.blacklist_lang;
    }
    let languages: LanguageFilter = config.languages.clone().normalized();

    let entries = with_document(&args.page, &config, |session| {
        let chapters = extracted(session.chapters(), "extract chapters")?;
        extracted(
            catalog::chapter_list(chapters, &languages, session.site()),
            "build chapter list",
        )
    })?;

    let count = write_json_lines(entries)?;
    tracing::info!(count, url = %args.page.url, "wrote chapters");
    Ok(())
}

pub fn pages(args: PagesArgs) -> anyhow::Result<()> {
    let config = load_config(&args.site)?;
    let body = read_input(&args.json)?;
    let urls = extracted(
        pages::parse_pages_response(&body, &config.site()),
        "parse chapter pages",
    )?;

    let count = write_json_lines(catalog::page_records(&urls))?;
    tracing::info!(count, "wrote pages");
    Ok(())
}

pub fn search(args: SearchArgs) -> anyhow::Result<()> {
    let config = load_config(&args.site)?;
    let site = config.site();
    let body = read_input(&args.json)?;
    let listing = extracted(
        search::parse_book_search_response(&body),
        "parse book search listing",
    )?;

    let records = match search::resolve_query(&site, &args.query) {
        Some(book_id) => {
            let title = listing
                .get(&book_id)
                .with_context(|| format!("book {book_id} is not in the search listing"))?;
            tracing::debug!(book_id = %book_id, "query resolved to a book url");
            vec![SearchHitRecord {
                url: site.book_url(&book_id).to_string(),
                title: title.clone(),
                book_id,
                matches: None,
            }]
        }
        None => {
            let hits = search::simple_search(&listing, &args.query);
            catalog::search_hit_records(&hits, &site)
        }
    };

    let count = write_json_lines(records)?;
    tracing::info!(count, query = %args.query, "wrote search results");
    Ok(())
}
