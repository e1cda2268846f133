use eyre::Context;
use std::io::IsTerminal;
use std::sync::Arc;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use youtube_companion::db::{Database, EventKind, Video};
use youtube_companion::oauth::OAuthManager;
use youtube_companion::token_store::FileTokenStore;
use youtube_companion::youtube_api::YouTubeClient;
use youtube_companion::{Companion, CompanionError, Config};

const OAUTH_DONE: &str = include_str!("../../oauth_success.html");

const USAGE: &str = "\
usage: youtube-companion <command> [args]

commands:
  authorize                              connect a YouTube account
  revoke                                 forget the stored YouTube credential
  status                                 show whether a YouTube account is connected
  videos [--by-views]                    list stored videos
  add <url-or-id>                        add a video
  show <video>                           show a video and its notes
  sync <video>                           refetch a video's details from YouTube
  update <video> [--title T] [--description D]
                                         change a video's title or description on YouTube
  remove <video>                         forget a video and its notes
  comments <video>                       list recent comments
  comment <video> <text>                 post a comment
  reply <video> <comment-id> <text>      reply to a comment
  delete-comment <video> <comment-id>    delete a comment
  note add <video> <text>                add a note
  note edit <video> <note> <text>        change a note
  note delete <video> <note>             delete a note
  events [--type T] [--limit N]          show the activity log

<video> and <note> are local IDs as shown by `videos` and `show`.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Authorize,
    Revoke,
    Status,
    Help,
    Library(Action),
}

/// Commands that work on the local video library.
#[derive(Debug, PartialEq, Eq)]
enum Action {
    Videos { by_views: bool },
    Add { url_or_id: String },
    Show { video: i64 },
    Sync { video: i64 },
    Update { video: i64, title: Option<String>, description: Option<String> },
    Remove { video: i64 },
    Comments { video: i64 },
    Comment { video: i64, text: String },
    Reply { video: i64, parent: String, text: String },
    DeleteComment { video: i64, comment: String },
    AddNote { video: i64, text: String },
    EditNote { video: i64, note: i64, text: String },
    DeleteNote { video: i64, note: i64 },
    Events { kind: Option<EventKind>, limit: u32 },
}

fn id(arg: Option<&String>, what: &str) -> eyre::Result<i64> {
    let Some(arg) = arg else {
        eyre::bail!("missing <{what}>\n\n{USAGE}");
    };
    arg.parse()
        .with_context(|| format!("<{what}> must be a number, got {arg:?}"))
}

fn text(arg: Option<&String>, what: &str) -> eyre::Result<String> {
    match arg {
        Some(arg) => Ok(arg.clone()),
        None => eyre::bail!("missing <{what}>\n\n{USAGE}"),
    }
}

/// Reads `--flag value` pairs; anything else is an error.
fn flags<'a>(args: &'a [String], known: &[&str]) -> eyre::Result<Vec<(&'a str, &'a str)>> {
    let mut found = Vec::new();
    let mut args = args.iter();
    while let Some(flag) = args.next() {
        if !known.contains(&flag.as_str()) {
            eyre::bail!("unexpected argument {flag:?}\n\n{USAGE}");
        }
        let Some(value) = args.next() else {
            eyre::bail!("{flag} needs a value");
        };
        found.push((flag.as_str(), value.as_str()));
    }
    Ok(found)
}

impl Command {
    fn parse(args: &[String]) -> eyre::Result<Self> {
        let Some((command, rest)) = args.split_first() else {
            eyre::bail!("{USAGE}");
        };

        let action = match command.as_str() {
            "authorize" => return Ok(Self::Authorize),
            "revoke" => return Ok(Self::Revoke),
            "status" => return Ok(Self::Status),
            "help" | "--help" | "-h" => return Ok(Self::Help),
            "videos" => match rest {
                [] => Action::Videos { by_views: false },
                [flag] if flag == "--by-views" => Action::Videos { by_views: true },
                _ => eyre::bail!("unexpected arguments to videos\n\n{USAGE}"),
            },
            "add" => Action::Add {
                url_or_id: text(rest.first(), "url-or-id")?,
            },
            "show" => Action::Show {
                video: id(rest.first(), "video")?,
            },
            "sync" => Action::Sync {
                video: id(rest.first(), "video")?,
            },
            "update" => {
                let video = id(rest.first(), "video")?;
                let mut title = None;
                let mut description = None;
                let args = rest.get(1..).unwrap_or_default();
                for (flag, value) in flags(args, &["--title", "--description"])? {
                    match flag {
                        "--title" => title = Some(value.to_string()),
                        _ => description = Some(value.to_string()),
                    }
                }
                if title.is_none() && description.is_none() {
                    eyre::bail!("update needs --title and/or --description");
                }
                Action::Update {
                    video,
                    title,
                    description,
                }
            }
            "remove" => Action::Remove {
                video: id(rest.first(), "video")?,
            },
            "comments" => Action::Comments {
                video: id(rest.first(), "video")?,
            },
            "comment" => Action::Comment {
                video: id(rest.first(), "video")?,
                text: text(rest.get(1), "text")?,
            },
            "reply" => Action::Reply {
                video: id(rest.first(), "video")?,
                parent: text(rest.get(1), "comment-id")?,
                text: text(rest.get(2), "text")?,
            },
            "delete-comment" => Action::DeleteComment {
                video: id(rest.first(), "video")?,
                comment: text(rest.get(1), "comment-id")?,
            },
            "note" => match rest.first().map(String::as_str) {
                Some("add") => Action::AddNote {
                    video: id(rest.get(1), "video")?,
                    text: text(rest.get(2), "text")?,
                },
                Some("edit") => Action::EditNote {
                    video: id(rest.get(1), "video")?,
                    note: id(rest.get(2), "note")?,
                    text: text(rest.get(3), "text")?,
                },
                Some("delete") => Action::DeleteNote {
                    video: id(rest.get(1), "video")?,
                    note: id(rest.get(2), "note")?,
                },
                _ => eyre::bail!("note needs add, edit or delete\n\n{USAGE}"),
            },
            "events" => {
                let mut kind = None;
                let mut limit = 20;
                for (flag, value) in flags(rest, &["--type", "--limit"])? {
                    match flag {
                        "--type" => {
                            kind = Some(
                                EventKind::from_name(value)
                                    .ok_or_else(|| eyre::eyre!("unknown event type {value:?}"))?,
                            );
                        }
                        _ => {
                            limit = value.parse().with_context(|| {
                                format!("--limit must be a number, got {value:?}")
                            })?;
                        }
                    }
                }
                Action::Events { kind, limit }
            }
            other => eyre::bail!("unknown command {other:?}\n\n{USAGE}"),
        };
        Ok(Self::Library(action))
    }
}

/// Turns errors that need the user to authorize into a hint about how to do that.
fn explain(e: CompanionError) -> eyre::Report {
    if e.requires_authorization() {
        eyre::eyre!("{e}\nrun `youtube-companion authorize` to connect your YouTube account")
    } else {
        e.into()
    }
}

fn print_video(video: &Video) {
    println!("[{}] {}", video.id, video.title);
    println!("    {}", video.watch_url());
    println!(
        "    {} views, {} likes, {} comments",
        video.view_count, video.like_count, video.comment_count
    );
    if let Some(published_at) = video.published_at {
        println!("    published {published_at}");
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;
    let config = Config::from_env().context("load configuration")?;

    // Commands that never reach YouTube work without OAuth client credentials.
    let (client_id, client_secret) = config.oauth_client().unwrap_or(("", ""));
    let store = FileTokenStore::new(&config.token_path);
    let oauth = Arc::new(OAuthManager::new(client_id, client_secret, store));

    let action = match command {
        Command::Help => {
            println!("{USAGE}");
            return Ok(());
        }
        Command::Authorize => {
            config.oauth_client()?;
            oauth
                .authenticate(config.redirect_addr, OAUTH_DONE)
                .await
                .context("authorize with YouTube")?;
            println!("YouTube account connected");
            return Ok(());
        }
        Command::Revoke => {
            oauth.revoke().await.context("forget YouTube credential")?;
            println!("YouTube authorization revoked");
            return Ok(());
        }
        Command::Status => {
            if oauth.is_authorized().await {
                println!("connected to YouTube");
            } else {
                println!("not connected; run `youtube-companion authorize`");
            }
            return Ok(());
        }
        Command::Library(action) => action,
    };

    let db = Database::connect(&config.database_url)
        .await
        .with_context(|| format!("open database {}", config.database_url))?;
    let youtube = YouTubeClient::new(oauth, config.api_key.clone(), reqwest::Client::new());
    let companion = Companion::new(youtube, db);

    match action {
        Action::Videos { by_views } => {
            let videos = if by_views {
                companion.db().videos_by_views().await
            } else {
                companion.db().recent_videos().await
            }
            .context("list videos")?;
            if videos.is_empty() {
                println!("no videos yet; add one with `youtube-companion add <url>`");
            }
            for video in &videos {
                print_video(video);
            }
        }
        Action::Add { url_or_id } => {
            let added = companion.add_video(&url_or_id, None).await.map_err(explain)?;
            if added.already_present {
                println!("video already exists in the system");
            } else {
                println!("video successfully added");
            }
            print_video(&added.video);
        }
        Action::Show { video } => {
            let page = companion.show_video(video, None).await.map_err(explain)?;
            print_video(&page.video);
            if let Some(description) = page.video.description.as_deref().filter(|d| !d.is_empty()) {
                println!();
                println!("{description}");
            }
            println!();
            if page.notes.is_empty() {
                println!("no notes");
            }
            for note in &page.notes {
                println!("note {} ({}):", note.id, note.updated_at);
                println!("    {}", note.content);
            }
            if !page.authorized {
                println!();
                println!("not connected to YouTube; counts may be stale");
            }
        }
        Action::Sync { video } => {
            let video = companion.sync_video(video, None).await.map_err(explain)?;
            println!("video details synced");
            print_video(&video);
        }
        Action::Update {
            video,
            title,
            description,
        } => {
            let video = companion
                .update_video(video, title.as_deref(), description.as_deref(), None)
                .await
                .map_err(explain)?;
            println!("video updated on YouTube");
            print_video(&video);
        }
        Action::Remove { video } => {
            companion.remove_video(video).await.map_err(explain)?;
            println!("video removed from database");
        }
        Action::Comments { video } => {
            let comments = companion.comments(video).await.map_err(explain)?;
            if comments.is_empty() {
                println!("no comments");
            }
            for comment in &comments {
                println!(
                    "{} {} ({} likes, {} replies) [{}]",
                    comment.published_at,
                    comment.author,
                    comment.like_count,
                    comment.reply_count,
                    comment.id
                );
                println!("    {}", comment.text);
            }
        }
        Action::Comment { video, text } => {
            let id = companion
                .post_comment(video, &text, None)
                .await
                .map_err(explain)?;
            println!("comment posted ({id})");
        }
        Action::Reply {
            video,
            parent,
            text,
        } => {
            let id = companion
                .reply_to_comment(video, &parent, &text, None)
                .await
                .map_err(explain)?;
            println!("reply posted ({id})");
        }
        Action::DeleteComment { video, comment } => {
            companion
                .delete_comment(video, &comment, None)
                .await
                .map_err(explain)?;
            println!("comment deleted");
        }
        Action::AddNote { video, text } => {
            let note = companion.add_note(video, &text, None).await.map_err(explain)?;
            println!("note {} added", note.id);
        }
        Action::EditNote { video, note, text } => {
            companion
                .edit_note(video, note, &text, None)
                .await
                .map_err(explain)?;
            println!("note {note} updated");
        }
        Action::DeleteNote { video, note } => {
            companion
                .delete_note(video, note, None)
                .await
                .map_err(explain)?;
            println!("note {note} deleted");
        }
        Action::Events { kind, limit } => {
            let events = match kind {
                Some(kind) => companion.db().events_of_type(kind).await,
                None => companion.db().recent_events(limit).await,
            }
            .context("list events")?;
            for event in events.iter().take(limit as usize) {
                println!("{} {} {}", event.created_at, event.event_type, event.event_data);
            }
        }
    }

    Ok(())
}
