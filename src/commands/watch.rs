use crate::{
    WatchArgs,
    build::{Builder, FileWatcher, MetadataCache, PathFilter, WatchEvent},
    commands::build::log_report,
};

pub async fn run(args: &WatchArgs) -> Result<(), anyhow::Error> {
    // Metadata stays cached across rebuilds; entries are revalidated by mtime
    let mut cache = MetadataCache::new();

    // The first build must succeed so a broken setup is reported up front
    let builder = Builder::setup(&args.source, args.out.clone())?;
    log_report(&builder.build(&mut cache).await?);

    let filter = PathFilter::new(&args.source, &args.out);
    let mut watcher = FileWatcher::new(&args.source, filter, args.poll)?;
    tracing::info!("watching {} for changes, press Ctrl+C to stop", args.source.display());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = watcher.recv() => match event {
                Some(WatchEvent::FilesChanged(changes)) => {
                    tracing::info!("detected {} change(s), rebuilding", changes.len());
                    for path in &changes {
                        tracing::debug!("changed: {}", path.display());
                    }
                    rebuild(args, &mut cache).await;
                }
                Some(WatchEvent::Error(e)) => tracing::error!("watch error: {e}"),
                None => break,
            },
        }
    }

    Ok(())
}

/// Set up and build again, so config and template edits are picked up.
/// Errors are logged and watching continues.
async fn rebuild(args: &WatchArgs, cache: &mut MetadataCache) {
    let result = match Builder::setup(&args.source, args.out.clone()) {
        Ok(builder) => builder.build(cache).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => log_report(&report),
        Err(e) => tracing::error!("build error: {e}"),
    }
}
