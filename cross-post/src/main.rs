//! cross-post - Post one piece of content to LinkedIn, X and Substack

use clap::Parser;
use libcrosspost::logging;
use libcrosspost::service::{validate_request, Event, EventBus};
use libcrosspost::types::{ArticleMeta, LinkedInOptions, SubstackOptions, Visibility, XOptions};
use libcrosspost::{
    Config, CrosspostError, FileSessionStore, MediaKind, MultiPlatformPostRequest,
    MultiPlatformPostResponse, Platform, PlatformSpecificOptions, PostContent, PostingSession,
    Result,
};
use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Exit code of a run interrupted with Ctrl-C
const EXIT_CANCELLED: i32 = 130;

#[derive(Parser, Debug)]
#[command(name = "cross-post")]
#[command(version)]
#[command(about = "Post content to LinkedIn, X and Substack", long_about = None)]
#[command(after_help = "\
EXAMPLES:
    cross-post \"Shipping today\" -p x,linkedin
    echo \"Weekly notes\" | cross-post -p substack --substack-title \"Week 12\"
    cross-post \"Launch\" -p linkedin --image launch.png --visibility connections

EXIT CODES:
    0   - Posted to every platform
    1   - At least one platform failed
    3   - Invalid input or request
    130 - Cancelled with Ctrl-C")]
struct Cli {
    /// Content to post (reads from stdin if not provided)
    content: Option<String>,

    /// Target platform(s), comma-separated (linkedin, x, substack)
    #[arg(short, long)]
    platform: Option<String>,

    /// Attach an image (jpg, png, gif, webp)
    #[arg(long, value_name = "PATH", conflicts_with = "video")]
    image: Option<PathBuf>,

    /// Attach a video (mp4, mov, webm)
    #[arg(long, value_name = "PATH")]
    video: Option<PathBuf>,

    /// LinkedIn visibility (public or connections)
    #[arg(long, default_value = "public")]
    visibility: String,

    /// Link preview URL for LinkedIn
    #[arg(long, value_name = "URL")]
    article_url: Option<String>,

    /// Substack post title (required when posting to Substack)
    #[arg(long)]
    substack_title: Option<String>,

    /// Substack post subtitle
    #[arg(long)]
    substack_subtitle: Option<String>,

    /// Publish on Substack instead of saving a draft
    #[arg(long)]
    publish: bool,

    /// X post id to reply to
    #[arg(long, value_name = "ID")]
    reply_to: Option<String>,

    /// Pause between platforms in milliseconds (overrides config)
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Output format (text or json)
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    logging::init_default(cli.verbose);

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> Result<i32> {
    let format = parse_format(&cli.format)?;
    let mut config = Config::load_or_default()?;
    if let Some(delay_ms) = cli.delay_ms {
        config.posting.delay_ms = delay_ms;
    }

    let request = build_request(&cli, &config)?;
    validate_request(&request)?;

    let sessions = Arc::new(FileSessionStore::new(config.session.expand_path()));
    let events = EventBus::default();
    let session = Arc::new(
        PostingSession::from_config(&config, sessions)?.with_event_bus(events.clone()),
    );
    debug!(
        "Posting to {} platform(s) with a {:?} delay",
        request.platforms.len(),
        session.options().delay
    );

    let progress = {
        let mut events = events.subscribe();
        tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if let Event::PlatformSettled {
                    result, progress, ..
                } = event
                {
                    info!(
                        "[{:>3}%] {} {}",
                        progress,
                        result.platform.display_name(),
                        if result.success { "posted" } else { "failed" }
                    );
                }
            }
        })
    };

    let interrupt = {
        let session = Arc::clone(&session);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() && session.cancel_posting() {
                info!("Cancelling, outstanding requests will be abandoned");
            }
        })
    };

    let response = session.submit(request).await;
    interrupt.abort();
    progress.abort();
    let response = response?;

    print_response(&response, format)?;

    Ok(exit_code_for(&response))
}

fn parse_format(format: &str) -> Result<OutputFormat> {
    match format.to_lowercase().as_str() {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(CrosspostError::InvalidInput(format!(
            "Invalid format '{}'. Valid options: text, json",
            other
        ))),
    }
}

fn parse_platforms(platform: Option<&str>, config: &Config) -> Result<Vec<Platform>> {
    match platform {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::parse::<Platform>)
            .collect(),
        None => Ok(config.defaults.platforms.clone()),
    }
}

fn parse_visibility(visibility: &str) -> Result<Visibility> {
    match visibility.to_lowercase().as_str() {
        "public" => Ok(Visibility::Public),
        "connections" => Ok(Visibility::Connections),
        other => Err(CrosspostError::InvalidInput(format!(
            "Invalid visibility '{}'. Valid options: public, connections",
            other
        ))),
    }
}

fn read_content(content: Option<&str>) -> Result<String> {
    if let Some(content) = content {
        return Ok(content.to_string());
    }

    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Err(CrosspostError::InvalidInput(
            "No content provided. Pass it as an argument or pipe it via stdin".to_string(),
        ));
    }

    let mut buffer = String::new();
    stdin
        .read_to_string(&mut buffer)
        .map_err(|e| CrosspostError::InvalidInput(format!("Failed to read stdin: {}", e)))?;
    Ok(buffer.trim_end_matches(['\n', '\r']).to_string())
}

fn load_content(cli: &Cli) -> Result<PostContent> {
    let text = read_content(cli.content.as_deref())?;

    let (path, expected) = match (&cli.image, &cli.video) {
        (Some(path), _) => (Some(path), MediaKind::Image),
        (None, Some(path)) => (Some(path), MediaKind::Video),
        (None, None) => (None, MediaKind::Text),
    };

    let content = match path {
        Some(path) => {
            let content = PostContent::text(text).with_media_file(path)?;
            if content.media_kind != expected {
                return Err(CrosspostError::InvalidInput(format!(
                    "'{}' is not a {} file",
                    path.display(),
                    if expected == MediaKind::Image { "image" } else { "video" }
                )));
            }
            content
        }
        None => PostContent::text(text),
    };

    if content.text.trim().is_empty() && content.media.is_none() {
        return Err(CrosspostError::InvalidInput(
            "Content cannot be empty".to_string(),
        ));
    }
    Ok(content)
}

fn build_request(cli: &Cli, config: &Config) -> Result<MultiPlatformPostRequest> {
    let platforms = parse_platforms(cli.platform.as_deref(), config)?;
    let content = load_content(cli)?;

    let linkedin = LinkedInOptions {
        visibility: parse_visibility(&cli.visibility)?,
        article: cli.article_url.as_ref().map(|url| ArticleMeta {
            url: url.clone(),
            title: None,
            description: None,
        }),
        ..Default::default()
    };

    let substack = cli.substack_title.as_ref().map(|title| SubstackOptions {
        title: title.clone(),
        subtitle: cli.substack_subtitle.clone(),
        draft: !cli.publish,
    });

    let x = cli.reply_to.as_ref().map(|id| XOptions {
        reply_to: Some(id.clone()),
    });

    Ok(MultiPlatformPostRequest {
        platforms,
        content,
        platform_specific: PlatformSpecificOptions {
            linkedin: Some(linkedin),
            x,
            substack,
        },
    })
}

fn print_response(response: &MultiPlatformPostResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(response)?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            for result in &response.results {
                if result.success {
                    println!("✓ {}", result.platform.display_name());
                } else {
                    println!(
                        "✗ {}: {}",
                        result.platform.display_name(),
                        result.error.as_deref().unwrap_or("failed")
                    );
                }
            }
            println!("{}", response.message);
        }
    }
    Ok(())
}

fn exit_code_for(response: &MultiPlatformPostResponse) -> i32 {
    if response.success {
        0
    } else if response.message == libcrosspost::service::session::CANCELLED_MESSAGE {
        EXIT_CANCELLED
    } else {
        1
    }
}
