use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use quran_wbw_rs::client::{DEFAULT_PROXY_URL, ProxyClient};
use quran_wbw_rs::export::{DocumentRenderer, write_export};
use quran_wbw_rs::gloss::{AnnotationSource, WordBreakdown};
use quran_wbw_rs::{
    AnnotationProvider, ExportDocument, InclusionFlags, PdfRenderer, ReaderState, Selection,
    StaticGlossary, VerseRange, decode_escapes, preview, segment_words,
};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "quran_wbw_rs=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(
    name = "quran-wbw",
    about = "Word-by-word Quran proxy, preview and PDF export",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Base URL of the proxy service used by client commands.
    #[arg(long, global = true, env = "QURAN_WBW_PROXY", default_value = DEFAULT_PROXY_URL)]
    proxy: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the proxy service.
    #[cfg(feature = "web")]
    Serve(ServeArgs),
    /// List all chapters.
    Chapters,
    /// Show the word-by-word table for a verse range.
    Preview(SelectionArgs),
    /// Write the word-by-word table for a verse range as a PDF.
    Export {
        #[command(flatten)]
        selection: SelectionArgs,
        /// Directory the PDF is written to.
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Decode, segment and annotate text locally, without the proxy.
    Words {
        /// Verse text; literal \uXXXX escapes are decoded first.
        text: String,
    },
}

#[cfg(feature = "web")]
#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: std::net::IpAddr,
    /// Port to bind.
    #[arg(long, env = "PORT", default_value_t = 3000)]
    port: u16,
    /// Base URL of the upstream Quran API.
    #[arg(
        long,
        env = "QURAN_WBW_UPSTREAM",
        default_value = quran_wbw_rs::upstream::DEFAULT_UPSTREAM_URL
    )]
    upstream_url: String,
    /// Edition used for the Arabic script text.
    #[arg(long, default_value = quran_wbw_rs::upstream::DEFAULT_SCRIPT_EDITION)]
    script_edition: String,
    /// Edition used for the translation text.
    #[arg(long, default_value = quran_wbw_rs::upstream::DEFAULT_TRANSLATION_EDITION)]
    translation_edition: String,
}

#[derive(Args, Debug, Clone, Copy)]
struct SelectionArgs {
    /// Chapter number (1-114).
    chapter: u16,
    /// First verse to include; defaults to 1.
    #[arg(long)]
    start: Option<u32>,
    /// Last verse to include; defaults to the chapter's last verse.
    #[arg(long)]
    end: Option<u32>,
    /// Include each word's transliteration.
    #[arg(long)]
    transliteration: bool,
    /// Include each word's meaning.
    #[arg(long)]
    translation: bool,
    /// Include grammar notes.
    #[arg(long)]
    grammar: bool,
}

impl SelectionArgs {
    fn range(&self) -> VerseRange {
        VerseRange::new(self.start, self.end)
    }

    fn flags(&self) -> InclusionFlags {
        InclusionFlags {
            transliteration: self.transliteration,
            translation: self.translation,
            grammar: self.grammar,
        }
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(dispatch(cli))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn dispatch(cli: Cli) -> Result<(), Box<dyn Error>> {
    let client = ProxyClient::new(cli.proxy.clone());
    match cli.command {
        #[cfg(feature = "web")]
        Command::Serve(args) => handle_serve(args).await,
        Command::Chapters => handle_chapters(&client, cli.json).await,
        Command::Preview(args) => handle_preview(&client, args, cli.json).await,
        Command::Export {
            selection,
            output_dir,
        } => handle_export(&client, selection, output_dir, cli.json).await,
        Command::Words { text } => handle_words(&text, cli.json),
    }
}

#[cfg(feature = "web")]
async fn handle_serve(args: ServeArgs) -> Result<(), Box<dyn Error>> {
    use quran_wbw_rs::upstream::UpstreamConfig;
    use quran_wbw_rs::web::{ServerConfig, serve};

    let config = ServerConfig {
        addr: std::net::SocketAddr::new(args.host, args.port),
        upstream: UpstreamConfig {
            base_url: args.upstream_url,
            script_edition: args.script_edition,
            translation_edition: args.translation_edition,
        },
    };
    serve(config).await?;
    Ok(())
}

async fn handle_chapters(client: &ProxyClient, as_json: bool) -> Result<(), Box<dyn Error>> {
    let state = ReaderState::new().with_chapters(client.chapters().await?);
    if as_json {
        println!("{}", serde_json::to_string_pretty(state.chapters())?);
        return Ok(());
    }
    if state.chapters().is_empty() {
        println!("No chapters returned by {}.", client.base_url());
        return Ok(());
    }
    for chapter in state.chapters() {
        println!(
            "{}  [{} verses]",
            chapter.label(),
            chapter.number_of_ayahs
        );
    }
    Ok(())
}

async fn load_selection(
    client: &ProxyClient,
    args: SelectionArgs,
) -> Result<Selection, Box<dyn Error>> {
    let mut state = ReaderState::new();
    let bundle = state.load(client.chapter(args.chapter).await?);
    Ok(Selection::build(
        bundle,
        args.range(),
        args.flags(),
        &StaticGlossary,
    ))
}

async fn handle_preview(
    client: &ProxyClient,
    args: SelectionArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let selection = load_selection(client, args).await?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&selection)?);
    } else if stdout_is_tty() {
        let skin = MadSkin::default();
        let markdown = preview::render_markdown(&selection);
        println!("{}", FmtText::from(&skin, &markdown, Some(markdown_width())));
    } else {
        print!("{}", preview::render_plain(&selection));
    }
    Ok(())
}

async fn handle_export(
    client: &ProxyClient,
    args: SelectionArgs,
    output_dir: PathBuf,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let selection = load_selection(client, args).await?;
    let document = ExportDocument::from_selection(&selection);
    let renderer = PdfRenderer::default();
    let path = write_export(&renderer, &document, &output_dir)?;

    if as_json {
        let payload = json!({
            "file": document.file_name(renderer.extension()),
            "path": path.display().to_string(),
            "verses": document.verse_count(),
            "rows": document.rows.len(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("PDF generated successfully: {}", path.display());
    }
    Ok(())
}

fn handle_words(text: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let decoded = decode_escapes(text);
    let glossary = StaticGlossary;
    let rows: Vec<WordBreakdown> = segment_words(&decoded.text)
        .into_iter()
        .enumerate()
        .map(|(index, word)| WordBreakdown {
            arabic: word.to_string(),
            transliteration: glossary.transliteration(word, index),
            translation: glossary.meaning(word, index),
            grammar: glossary.grammar(word, index),
            source: if glossary.contains(word) {
                AnnotationSource::Glossary
            } else {
                AnnotationSource::Placeholder
            },
        })
        .collect();

    if as_json {
        let payload = json!({
            "text": decoded.text,
            "decode_fallback": decoded.is_fallback(),
            "words": rows,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_word_table(&rows);
    }
    Ok(())
}

fn print_word_table(rows: &[WordBreakdown]) {
    if rows.is_empty() {
        println!("No words found.");
        return;
    }
    let width = rows
        .iter()
        .map(|row| row.arabic.chars().count())
        .max()
        .unwrap_or(4)
        .max("WORD".len());
    let translit = rows
        .iter()
        .map(|row| row.transliteration.len())
        .max()
        .unwrap_or(0)
        .max("TRANSLITERATION".len());
    println!(
        "{:<width$}  {:<translit$}  {}",
        "WORD", "TRANSLITERATION", "MEANING / GRAMMAR"
    );
    println!("{:-<width$}  {:-<translit$}  {}", "", "", "-----------------");
    for row in rows {
        let pad = width.saturating_sub(row.arabic.chars().count());
        println!(
            "{}{}  {:<translit$}  {} / {}",
            row.arabic,
            " ".repeat(pad),
            row.transliteration,
            row.translation,
            row.grammar
        );
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}
