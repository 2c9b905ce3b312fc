use anyhow::{bail, Context};
use colored::Colorize;
use kvgit_bucket::{Bucket, BucketOptions, CommitOutcome, CommitRequest, Utf8Codec, DEFAULT_MESSAGE};
use serde_json::json;
use tracing::debug;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut options = BucketOptions::new(&cli.repo).codec(Utf8Codec);
    if let Some(remote) = &cli.remote {
        options = options.remote(remote.clone());
    }
    let mut bucket = Bucket::open(options)
        .with_context(|| format!("cannot open bucket at {}", cli.repo.display()))?;
    debug!(path = %bucket.path().display(), remote = ?bucket.remote(), "bucket ready");
    let format = cli.format;

    match cli.command {
        Command::Get(args) => cmd_get(&bucket, args, format),
        Command::Set(args) => cmd_set(&mut bucket, args, format),
        Command::Delete(args) => cmd_delete(&mut bucket, args, format),
        Command::List(args) => cmd_list(&bucket, args, format),
        Command::Fetch => cmd_fetch(&bucket, format),
        Command::Update(args) => cmd_update(&mut bucket, args, format),
        Command::Push => cmd_push(&bucket, format),
        Command::Log(args) => cmd_log(&bucket, args, format),
    }
}

fn cmd_get(bucket: &Bucket<Utf8Codec>, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    let value = bucket.lookup(&args.key, !args.committed)?;
    match format {
        OutputFormat::Json => println!("{}", json!({ "key": args.key, "value": value })),
        OutputFormat::Text => match value {
            Some(value) => println!("{value}"),
            None => bail!("key not found: {}", args.key),
        },
    }
    Ok(())
}

fn commit(bucket: &mut Bucket<Utf8Codec>, opts: CommitOpts) -> anyhow::Result<CommitOutcome> {
    let mut request = CommitRequest::new(opts.message.unwrap_or_else(|| DEFAULT_MESSAGE.to_string()));
    if opts.no_push {
        request = request.without_push();
    }
    Ok(bucket.commit_with(request)?)
}

fn report_commit(bucket: &Bucket<Utf8Codec>, outcome: &CommitOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "commit": outcome.commit_id.to_hex(),
                "tree": outcome.tree_id.to_hex(),
                "pushed": outcome.pushed,
            })
        ),
        OutputFormat::Text => {
            println!("{} Committed {}", "✓".green().bold(), outcome.commit_id.short_hex().yellow());
            if outcome.pushed {
                println!("  Pushed to {}", bucket.remote().unwrap_or_default().blue());
            }
        }
    }
}

fn cmd_set(bucket: &mut Bucket<Utf8Codec>, args: SetArgs, format: OutputFormat) -> anyhow::Result<()> {
    bucket.set(&args.key, &args.value)?;
    let outcome = commit(bucket, args.commit)?;
    report_commit(bucket, &outcome, format);
    Ok(())
}

fn cmd_delete(bucket: &mut Bucket<Utf8Codec>, args: DeleteArgs, format: OutputFormat) -> anyhow::Result<()> {
    if !bucket.delete(&args.key)? {
        bail!("key not found: {}", args.key);
    }
    let outcome = commit(bucket, args.commit)?;
    report_commit(bucket, &outcome, format);
    Ok(())
}

fn cmd_list(bucket: &Bucket<Utf8Codec>, args: ListArgs, format: OutputFormat) -> anyhow::Result<()> {
    let keys = bucket.list(args.prefix.as_deref())?;
    match format {
        OutputFormat::Json => println!("{}", json!(keys)),
        OutputFormat::Text => {
            for key in keys {
                println!("{key}");
            }
        }
    }
    Ok(())
}

fn cmd_fetch(bucket: &Bucket<Utf8Codec>, format: OutputFormat) -> anyhow::Result<()> {
    let result = bucket.fetch()?;
    let head = result.remote_head.map(|id| id.to_hex());
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "objects_received": result.objects_received, "remote_head": head })
        ),
        OutputFormat::Text => {
            if result.refs_updated.is_empty() {
                println!("Fetching from {}... {}", bucket.remote().unwrap_or_default().bold(), "up to date".green());
            } else {
                println!(
                    "Fetched {} objects, remote at {}",
                    result.objects_received.to_string().bold(),
                    head.unwrap_or_else(|| "(empty)".into()).yellow()
                );
            }
        }
    }
    Ok(())
}

fn cmd_update(bucket: &mut Bucket<Utf8Codec>, args: UpdateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let result = bucket.update(args.force)?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({
                "previous": result.previous_head.map(|id| id.to_hex()),
                "head": result.head.map(|id| id.to_hex()),
                "changed": result.changed(),
            })
        ),
        OutputFormat::Text => match (result.changed(), result.head) {
            (false, _) => println!("Already {}", "up to date".green()),
            (true, Some(head)) => println!("{} Reset to {}", "✓".green().bold(), head.short_hex().yellow()),
            (true, None) => println!("{} Reset to empty remote", "✓".green().bold()),
        },
    }
    Ok(())
}

fn cmd_push(bucket: &Bucket<Utf8Codec>, format: OutputFormat) -> anyhow::Result<()> {
    let result = bucket.push()?;
    match format {
        OutputFormat::Json => println!(
            "{}",
            json!({ "objects_sent": result.objects_sent, "up_to_date": result.is_up_to_date() })
        ),
        OutputFormat::Text => {
            if result.is_up_to_date() {
                println!("Pushing to {}... {}", bucket.remote().unwrap_or_default().bold(), "up to date".green());
            } else {
                println!("{} Pushed {} objects", "✓".green().bold(), result.objects_sent.to_string().bold());
            }
        }
    }
    Ok(())
}

fn cmd_log(bucket: &Bucket<Utf8Codec>, args: LogArgs, format: OutputFormat) -> anyhow::Result<()> {
    let commits = bucket.history(args.limit)?;
    if format == OutputFormat::Json {
        let entries: Vec<_> = commits
            .iter()
            .map(|(id, commit)| {
                json!({
                    "id": id.to_hex(),
                    "tree": commit.tree.to_hex(),
                    "author": commit.author.identity().to_string(),
                    "time": commit.author.time,
                    "message": commit.message,
                })
            })
            .collect();
        println!("{}", json!(entries));
        return Ok(());
    }

    if commits.is_empty() {
        println!("No commits.");
    }
    for (id, commit) in commits {
        if args.oneline {
            println!("{} {}", id.short_hex().yellow(), commit.message);
            continue;
        }
        println!("{} {}", "commit".yellow(), id.to_hex().yellow());
        println!("Author: {}", commit.author.identity());
        if let Some(time) = commit.author.local_time() {
            println!("Date:   {}", time.format("%a %b %e %T %Y %z").to_string().dimmed());
        }
        println!("\n    {}\n", commit.message);
    }
    Ok(())
}
