//! SocialDesk - partner dashboard core from the terminal
#![allow(clippy::uninlined_format_args)]

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use chrono::Utc;
use tokio::sync::Notify;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use socialdesk::generate::GenerationRequest;
use socialdesk::linker::{AuthorizationRequest, CallbackOutcome, Confirmation, LinkOutcome, ProviderResponse};
use socialdesk::models::{BankDetails, Draft, LeadFilter, LeadStatus, ProfileUpdate, SocialLinks, Topic};
use socialdesk::{Actor, Config, Platform, Services};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (RUST_LOG=debug for verbose output)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let command = parse_args()?;
    match command {
        Command::Help => {
            print_help();
            return Ok(());
        }
        Command::Version => {
            print_version();
            return Ok(());
        }
        _ => {}
    }

    let services = Services::open(Config::load()?)?;
    match command {
        Command::Login { email } => login(&services, &email).await,
        Command::Logout => logout(&services),
        Command::Whoami => whoami(&services).await,
        Command::Profile { set } => profile(&services, set).await,
        Command::Link { platform } => link(&services, platform).await,
        Command::Unlink { platform, yes } => unlink(&services, platform, yes).await,
        Command::Integrations => integrations(&services).await,
        Command::Generate {
            topic,
            platform,
            tone,
            image,
            schedule,
        } => generate(&services, topic, platform, tone, image, schedule.as_deref()).await,
        Command::Schedule {
            topic,
            platform,
            when,
            content,
        } => schedule(&services, topic, platform, &when, content).await,
        Command::Posts { watch } => posts(&services, watch).await,
        Command::Publish { post_id } => publish(&services, post_id).await,
        Command::Run { interval } => run(&services, interval).await,
        Command::Leads { status, search } => leads(&services, status, search).await,
        Command::LeadsImport { file } => leads_import(&services, &file).await,
        Command::Help | Command::Version => Ok(()),
    }
}

/// CLI commands
enum Command {
    Login {
        email: String,
    },
    Logout,
    Whoami,
    Profile {
        set: Option<(String, Vec<String>)>,
    },
    Link {
        platform: Platform,
    },
    Unlink {
        platform: Platform,
        yes: bool,
    },
    Integrations,
    Generate {
        topic: Topic,
        platform: Platform,
        tone: Option<String>,
        image: bool,
        schedule: Option<String>,
    },
    Schedule {
        topic: Topic,
        platform: Platform,
        when: String,
        content: String,
    },
    Posts {
        watch: bool,
    },
    Publish {
        post_id: Uuid,
    },
    Run {
        interval: Option<u64>,
    },
    Leads {
        status: Option<LeadStatus>,
        search: String,
    },
    LeadsImport {
        file: PathBuf,
    },
    Help,
    Version,
}

fn flag_value(args: &[String], names: &[&str]) -> Option<String> {
    args.iter()
        .position(|a| names.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .cloned()
}

fn has_flag(args: &[String], names: &[&str]) -> bool {
    args.iter().any(|a| names.contains(&a.as_str()))
}

fn platform_arg(args: &[String], i: usize) -> Result<Platform> {
    let raw = args
        .get(i)
        .ok_or_else(|| anyhow!("Missing platform (instagram, facebook or tiktok)"))?;
    Platform::from_str(raw).ok_or_else(|| anyhow!("Unknown platform: {raw}"))
}

fn topic_arg(args: &[String], i: usize) -> Result<Topic> {
    let raw = args
        .get(i)
        .ok_or_else(|| anyhow!("Missing topic (promo, manasik, doa or tips)"))?;
    Topic::from_str(raw).ok_or_else(|| anyhow!("Unknown topic: {raw}"))
}

fn parse_args() -> Result<Command> {
    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        return Ok(Command::Help);
    }

    match args[1].as_str() {
        "-h" | "--help" | "help" => Ok(Command::Help),
        "-v" | "--version" | "version" => Ok(Command::Version),

        "login" => {
            let email = args
                .get(2)
                .ok_or_else(|| anyhow!("Missing email\nExample: socialdesk login mitra@example.com"))?
                .clone();
            Ok(Command::Login { email })
        }
        "logout" => Ok(Command::Logout),
        "whoami" => Ok(Command::Whoami),

        "profile" => match args.get(2).map(String::as_str) {
            None | Some("show") => Ok(Command::Profile { set: None }),
            Some("set") => {
                let field = args
                    .get(3)
                    .ok_or_else(|| anyhow!("Missing field (name, phone, instagram, facebook, tiktok, bank)"))?
                    .clone();
                let values = args[4.min(args.len())..].to_vec();
                if values.is_empty() {
                    return Err(anyhow!("Missing value for {field}"));
                }
                Ok(Command::Profile {
                    set: Some((field, values)),
                })
            }
            Some(other) => Err(anyhow!("Unknown profile action: {other}")),
        },

        "link" => Ok(Command::Link {
            platform: platform_arg(&args, 2)?,
        }),
        "unlink" => Ok(Command::Unlink {
            platform: platform_arg(&args, 2)?,
            yes: has_flag(&args, &["--yes", "-y"]),
        }),
        "integrations" | "accounts" => Ok(Command::Integrations),

        "generate" | "gen" => Ok(Command::Generate {
            topic: topic_arg(&args, 2)?,
            platform: platform_arg(&args, 3)?,
            tone: flag_value(&args, &["--tone", "-t"]),
            image: has_flag(&args, &["--image", "-i"]),
            schedule: flag_value(&args, &["--schedule", "-s"]),
        }),

        "schedule" => {
            let topic = topic_arg(&args, 2)?;
            let platform = platform_arg(&args, 3)?;
            let when = args
                .get(4)
                .ok_or_else(|| anyhow!("Missing time (e.g. \"in 2h\", 15:00, 2026-11-01 09:00)"))?
                .clone();
            let content = args[5.min(args.len())..].join(" ");
            if content.trim().is_empty() {
                return Err(anyhow!("Missing post content"));
            }
            Ok(Command::Schedule {
                topic,
                platform,
                when,
                content,
            })
        }

        "posts" => Ok(Command::Posts {
            watch: has_flag(&args, &["--watch", "-w"]),
        }),

        "publish" => {
            let raw = args.get(2).ok_or_else(|| anyhow!("Missing post id"))?;
            let post_id = Uuid::parse_str(raw).map_err(|_| anyhow!("Not a post id: {raw}"))?;
            Ok(Command::Publish { post_id })
        }

        "run" => {
            let interval = flag_value(&args, &["--interval", "-n"])
                .map(|s| s.parse::<u64>())
                .transpose()
                .map_err(|_| anyhow!("--interval takes a number of seconds"))?;
            Ok(Command::Run { interval })
        }

        "leads" => {
            if args.get(2).map(String::as_str) == Some("import") {
                let file = args
                    .get(3)
                    .ok_or_else(|| anyhow!("Missing file\nExample: socialdesk leads import leads.json"))?;
                return Ok(Command::LeadsImport {
                    file: PathBuf::from(file),
                });
            }
            let status = flag_value(&args, &["--status"])
                .map(|s| LeadStatus::from_str(&s).ok_or_else(|| anyhow!("Unknown lead status: {s}")))
                .transpose()?;
            Ok(Command::Leads {
                status,
                search: flag_value(&args, &["--search", "-q"]).unwrap_or_default(),
            })
        }

        other => Err(anyhow!(
            "Unknown command: {other}\nRun 'socialdesk --help' for usage"
        )),
    }
}

fn print_help() {
    let config_path = socialdesk::Config::default_path()
        .map_or_else(|_| "Unknown".to_string(), |p| p.display().to_string());

    println!(
        r#"{}
SocialDesk - social publishing for travel partners

USAGE:
    socialdesk [COMMAND]

ACCOUNT:
    login <email>                      Sign in (password is prompted)
    logout                             Sign out
    whoami                             Show the signed-in user
    profile [show]                     Show your profile
    profile set <field> <value>        Update name, phone, instagram,
                                       facebook, tiktok, fee or
                                       bank <bank> <number> <holder>

SOCIAL ACCOUNTS:
    link <platform>                    Link instagram, facebook or tiktok
    unlink <platform> [--yes]          Disconnect a platform
    integrations                       List linked platforms

CONTENT:
    generate <topic> <platform>        Draft a caption (topics: promo,
      Options:                         manasik, doa, tips)
        -t, --tone <tone>              Tone of voice
        -i, --image                    Also build a branded image
        -s, --schedule <when>          Schedule the draft right away
    schedule <topic> <platform> <when> <content>
                                       Schedule your own caption
      Examples:
        socialdesk generate promo instagram --image --schedule "in 2h"
        socialdesk schedule tips tiktok 15:00 "Tips packing koper"

    posts [--watch]                    List your posts (live with --watch)
    publish <post-id>                  Publish a post now
    run [--interval <secs>]            Publish due posts until Ctrl-C

LEADS:
    leads [--status S] [--search T]    List leads (NEW, WARM, HOT, COLD)
    leads import <file.json>           Import leads from a JSON array

OPTIONS:
    -h, --help                         Show this help message
    -v, --version                      Show version information

CONFIG:
    {}
"#,
        socialdesk::LOGO,
        config_path
    );
}

fn print_version() {
    println!("socialdesk {}", socialdesk::VERSION);
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Resolves once Ctrl-C is pressed
fn shutdown_signal() -> Result<Arc<Notify>> {
    let notify = Arc::new(Notify::new());
    let handler = Arc::clone(&notify);
    ctrlc::set_handler(move || handler.notify_one())?;
    Ok(notify)
}

fn signed_in(services: &Services) -> Result<Actor> {
    let session = services.session()?;
    let actor = session
        .require()
        .map_err(|_| anyhow!("Not signed in. Run: socialdesk login <email>"))?;
    Ok(actor.clone())
}

async fn login(services: &Services, email: &str) -> Result<()> {
    let mut session = services.session()?;
    let password = prompt("Password: ")?;
    let actor = session.sign_in(email, &password).await?;
    println!("✓ Signed in as {}", actor.email);
    Ok(())
}

fn logout(services: &Services) -> Result<()> {
    services.session()?.sign_out()?;
    println!("✓ Signed out");
    Ok(())
}

async fn whoami(services: &Services) -> Result<()> {
    let session = services.session()?;
    let Some(actor) = session.current() else {
        println!("Not signed in");
        return Ok(());
    };

    let role = services
        .profiles
        .get(&actor.uid)
        .await?
        .map_or("unknown", |p| p.role.as_str());
    println!("{} ({}) · {}", actor.email, actor.uid, role);
    Ok(())
}

async fn profile(services: &Services, set: Option<(String, Vec<String>)>) -> Result<()> {
    let actor = signed_in(services)?;

    if let Some((field, values)) = set {
        let value = values.join(" ");
        let mut update = ProfileUpdate::default();
        match field.as_str() {
            "name" => update.display_name = Some(value),
            "phone" => update.phone_number = Some(value),
            "fee" => {
                update.fee_achievement =
                    Some(value.parse().map_err(|_| anyhow!("fee must be a number"))?);
            }
            "instagram" | "facebook" | "tiktok" => {
                let mut links = SocialLinks::default();
                match field.as_str() {
                    "instagram" => links.instagram = Some(value),
                    "facebook" => links.facebook = Some(value),
                    _ => links.tiktok = Some(value),
                }
                update.social_media = Some(links);
            }
            "bank" => {
                let [bank_name, account_number, holder @ ..] = values.as_slice() else {
                    return Err(anyhow!("Usage: profile set bank <bank> <number> <holder name>"));
                };
                if holder.is_empty() {
                    return Err(anyhow!("Missing account holder name"));
                }
                update.bank_details = Some(BankDetails {
                    bank_name: bank_name.clone(),
                    account_number: account_number.clone(),
                    account_name: holder.join(" "),
                });
            }
            other => return Err(anyhow!("Unknown profile field: {other}")),
        }
        services.profiles.update(&actor.uid, &update).await?;
        println!("✓ Profile updated");
    }

    let profile = services
        .profiles
        .get(&actor.uid)
        .await?
        .ok_or_else(|| anyhow!("No profile for {}", actor.uid))?;

    println!("\n{}", profile.display_name.as_deref().unwrap_or(&profile.email));
    println!("{}", "─".repeat(40));
    println!("Email      {}", profile.email);
    println!("Role       {}", profile.role.as_str());
    println!("Phone      {}", profile.phone_number.as_deref().unwrap_or("-"));
    println!("Fee        {:.2}", profile.fee_achievement);
    if let Some(bank) = &profile.bank_details {
        println!("Bank       {} {} ({})", bank.bank_name, bank.account_number, bank.account_name);
    }
    for (label, link) in [
        ("Instagram", &profile.social_media.instagram),
        ("Facebook", &profile.social_media.facebook),
        ("TikTok", &profile.social_media.tiktok),
    ] {
        if let Some(url) = link {
            println!("{label:<10} {url}");
        }
    }
    Ok(())
}

async fn link(services: &Services, platform: Platform) -> Result<()> {
    let actor = signed_in(services)?;

    match services.linker.begin_authorization(&actor, platform).await? {
        AuthorizationRequest::Redirect { url } => {
            println!("\n📋 Open this URL in your browser:\n\n  {}\n", url);
            let _ = open::that(&url);

            let callback = prompt("Paste the URL you were redirected to:\n")?;
            match services.linker.complete_authorization(&actor, &callback).await? {
                CallbackOutcome::Linked { integration, .. } => {
                    println!("✓ {} linked", integration.platform);
                }
                CallbackOutcome::NoOp => println!("Nothing to do: that URL has no authorization result"),
            }
        }
        AuthorizationRequest::Popup { app_id, scopes } => {
            println!("\nLog in with Facebook using app {} and grant:", app_id);
            for scope in &scopes {
                println!("  • {scope}");
            }
            let json = prompt("\nPaste the login response JSON (empty to cancel):\n")?;
            let response = if json.is_empty() {
                ProviderResponse::Cancelled
            } else {
                ProviderResponse::from_sdk_json(&json)?
            };

            match services
                .linker
                .on_provider_response(&actor, platform, response)
                .await?
            {
                LinkOutcome::Linked(integration) => println!("✓ {} linked", integration.platform),
                LinkOutcome::Cancelled => println!("Login cancelled"),
            }
        }
    }
    Ok(())
}

async fn unlink(services: &Services, platform: Platform, yes: bool) -> Result<()> {
    let actor = signed_in(services)?;

    let confirmation = if yes
        || prompt(&format!("Disconnect {platform}? [y/N] "))?.eq_ignore_ascii_case("y")
    {
        Confirmation::Confirmed
    } else {
        Confirmation::Declined
    };
    if confirmation == Confirmation::Declined {
        println!("Kept {platform} linked");
        return Ok(());
    }

    services.linker.disconnect(&actor, platform, confirmation).await?;
    println!("✓ {platform} disconnected");
    Ok(())
}

async fn integrations(services: &Services) -> Result<()> {
    let actor = signed_in(services)?;
    let linked = services.integrations.list(&actor.uid).await?;
    let now = Utc::now();

    for platform in Platform::all() {
        match linked.iter().find(|i| i.platform == *platform) {
            Some(i) => {
                let who = i.name.as_deref().or(i.provider_user_id.as_deref()).unwrap_or("linked");
                let state = if i.is_expired(now) { " (expired)" } else { "" };
                println!("✓ {:<10} {}{}", platform.name(), who, state);
            }
            None => println!("  {:<10} not linked", platform.name()),
        }
    }
    Ok(())
}

async fn generate(
    services: &Services,
    topic: Topic,
    platform: Platform,
    tone: Option<String>,
    image: bool,
    schedule_at: Option<&str>,
) -> Result<()> {
    let actor = signed_in(services)?;

    // Validate the time before spending a generation call
    let when = schedule_at
        .map(|s| socialdesk::schedule::parse_when(s, Utc::now()))
        .transpose()?;

    let mut request = GenerationRequest::new(topic, platform);
    request.tone = tone;
    request.include_image = image;

    println!("Generating {} caption for {}...", topic.label(), platform);
    let content = services.gateway.generate(Some(&actor), &request).await?;
    println!("\n{}\n", content.data);
    if let Some(url) = &content.image {
        println!("🖼  {url}");
    }

    if let Some(when) = when {
        let draft = content.into_draft(&request)?;
        let post = services.posts.schedule(&actor, draft, when).await?;
        println!("✓ Scheduled {} for {}", post.id, post.scheduled_time_display());
    }
    Ok(())
}

async fn schedule(
    services: &Services,
    topic: Topic,
    platform: Platform,
    when: &str,
    content: String,
) -> Result<()> {
    let actor = signed_in(services)?;
    let when = socialdesk::schedule::parse_when(when, Utc::now())?;

    let draft = Draft {
        topic,
        platform,
        content,
        image_url: None,
    };
    let post = services.posts.schedule(&actor, draft, when).await?;
    println!(
        "✓ Scheduled {} for {} (in {})",
        post.id,
        post.scheduled_time_display(),
        post.time_until(Utc::now())
    );
    Ok(())
}

fn print_posts(posts: &[socialdesk::ScheduledPost]) {
    let now = Utc::now();
    println!("{}", "─".repeat(72));
    if posts.is_empty() {
        println!("No posts yet");
    }
    for post in posts {
        let when = if post.status == socialdesk::PostStatus::Scheduled {
            format!("in {}", post.time_until(now))
        } else {
            post.scheduled_time_display()
        };
        println!(
            "{} {:<9} {:<9} {:<7} {}",
            post.id,
            post.platform.name(),
            post.status,
            post.topic,
            when
        );
        println!("    {}", post.preview(60));
        if let Some(reason) = &post.failure_reason {
            println!("    ✗ {reason}");
        }
    }
}

async fn posts(services: &Services, watch: bool) -> Result<()> {
    let actor = signed_in(services)?;

    if !watch {
        print_posts(&services.posts.list_for_user(&actor).await?);
        return Ok(());
    }

    let shutdown = shutdown_signal()?;
    let subscription = services
        .posts
        .watch_for_user(&actor, |posts| print_posts(&posts))
        .await?;
    shutdown.notified().await;
    drop(subscription);
    Ok(())
}

async fn publish(services: &Services, post_id: Uuid) -> Result<()> {
    let actor = signed_in(services)?;

    let result = services
        .functions()
        .call(
            "postToSocial",
            Some(&actor),
            serde_json::json!({ "postId": post_id }),
        )
        .await?;

    if result["success"].as_bool().unwrap_or(false) {
        println!(
            "✓ Posted ({})",
            result["externalId"].as_str().unwrap_or("no external id")
        );
    } else {
        println!(
            "✗ {}",
            result["failureReason"].as_str().unwrap_or("publishing failed")
        );
    }
    Ok(())
}

async fn run(services: &Services, interval: Option<u64>) -> Result<()> {
    let interval = Duration::from_secs(
        interval
            .unwrap_or(services.config.publisher.poll_interval_secs)
            .max(1),
    );
    let shutdown = shutdown_signal()?;

    println!("Publishing due posts every {}s (Ctrl-C to stop)", interval.as_secs());
    services
        .publisher
        .run(interval, async move { shutdown.notified().await })
        .await?;
    Ok(())
}

async fn leads(services: &Services, status: Option<LeadStatus>, search: String) -> Result<()> {
    signed_in(services)?;
    let leads = services.leads.list(&LeadFilter { status, search }).await?;

    if leads.is_empty() {
        println!("No leads match");
        return Ok(());
    }
    for lead in leads {
        println!(
            "{:<24} {:<16} {:<5} {:<10} {}",
            lead.name,
            lead.phone,
            lead.status.as_str(),
            lead.platform.as_str(),
            lead.last_contact_at.format("%Y-%m-%d")
        );
    }
    Ok(())
}

async fn leads_import(services: &Services, file: &std::path::Path) -> Result<()> {
    let count = services.leads.import_file(file).await?;
    println!("✓ Imported {count} leads");
    Ok(())
}
