use crate::conf::Conf;
use futures::future::join_all;
use std::{env, process::exit};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod conf;
mod db;
mod error;
mod job;
mod model;
mod provider;
mod repository;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    cli(&args).await;
}

async fn cli(args: &[String]) {
    let first_arg = args.first().unwrap_or_else(|| {
        error!("No args provided");
        exit(1);
    });

    let conf = Conf::new().unwrap_or_else(|e| {
        error!(%e, "Unable to load configuration");
        exit(1);
    });

    match first_arg.as_str() {
        "sync" => sync(conf, &args[1..]).await,
        "rebuild" => rebuild(conf, args.get(1)).await,
        "drop" => db::drop(&conf).unwrap_or_else(|e| {
            error!(%e, "Unable to drop database");
            exit(1);
        }),
        _ => {
            error!(?args, "Unknown argument");
            exit(1);
        }
    };
}

async fn sync(conf: Conf, args: &[String]) {
    let pool = db::pool(&conf);
    let jobs = job::build(conf, &pool).unwrap_or_else(|e| {
        error!(%e, "Unable to build sync jobs");
        exit(1);
    });

    match args.len() {
        0 => {
            join_all(jobs.iter().map(|it| it.schedule_sync())).await;
        }
        1 if args[0] == "now" => {
            let jobs: Vec<_> = jobs.iter().filter(|it| it.enabled()).collect();
            let results = join_all(jobs.iter().map(|it| it.sync())).await;

            let mut failed = false;
            for (job, result) in jobs.iter().zip(results) {
                if let Err(e) = result {
                    error!(provider = %job.name(), %e, "Sync failed");
                    failed = true;
                }
            }
            if failed {
                exit(1);
            }
        }
        _ => {
            error!(?args, "Invalid arguments");
            exit(1);
        }
    }
}

async fn rebuild(conf: Conf, provider: Option<&String>) {
    let provider = provider.unwrap_or_else(|| {
        error!("Provider name is missing");
        exit(1);
    });

    let pool = db::pool(&conf);
    let jobs = job::build(conf, &pool).unwrap_or_else(|e| {
        error!(%e, "Unable to build sync jobs");
        exit(1);
    });

    let job = jobs
        .iter()
        .find(|it| it.name() == provider.as_str())
        .unwrap_or_else(|| {
            error!(%provider, "Unknown provider");
            exit(1);
        });

    job.rebuild().await.unwrap_or_else(|e| {
        error!(provider = %job.name(), %e, "Rebuild failed");
        exit(1);
    });
}
