/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */
use std::error::Error;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time;

use aws_s3_transfer_unit::checkpoint::FileJournal;
use aws_s3_transfer_unit::io::DataChunk;
use aws_s3_transfer_unit::job::{Destination, JobController, Source, TransferJob};
use aws_s3_transfer_unit::metrics::unit::ByteUnit;
use aws_s3_transfer_unit::types::{ObjectAttributes, ObjectProperties};
use aws_sdk_s3::error::DisplayErrorContext;
use bytes::Bytes;
use clap::Parser;

type BoxError = Box<dyn Error + Send + Sync>;

#[derive(Debug, Clone, clap::Parser)]
#[command(name = "put")]
#[command(about = "Uploads a local file to S3 with a single resumable request.")]
pub struct Args {
    /// Local file to upload
    #[arg(required = true)]
    source: PathBuf,

    /// Destination to upload to <S3Uri>
    #[arg(required = true)]
    dest: S3Uri,

    /// Replace an existing object without checking it
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    force: bool,

    /// Refuse to replace an existing object
    #[arg(long, default_value_t = false, action = clap::ArgAction::SetTrue)]
    no_clobber: bool,

    /// Checkpoint journal; an existing journal resumes the upload
    #[arg(long)]
    journal: Option<PathBuf>,

    /// Content type stored with the object
    #[arg(long)]
    content_type: Option<String>,

    /// Largest file uploaded with a single request
    #[arg(long, default_value_t = 8388608)]
    single_request_threshold: u64,
}

#[derive(Clone, Debug)]
struct S3Uri {
    bucket: String,
    key: String,
}

impl FromStr for S3Uri {
    type Err = BoxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let path = s
            .strip_prefix("s3://")
            .ok_or_else(|| format!("expected an s3:// URI, got {s}"))?;
        match path.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => Ok(S3Uri {
                bucket: bucket.to_owned(),
                key: key.to_owned(),
            }),
            _ => Err(format!("expected s3://<bucket>/<key>, got {s}").into()),
        }
    }
}

/// Logs every decision and report of the job
#[derive(Debug)]
struct CliController {
    no_clobber: bool,
}

#[async_trait::async_trait]
impl JobController for CliController {
    async fn confirm_overwrite(
        &self,
        existing: &ObjectAttributes,
        source: &Source,
        destination: &Destination,
    ) -> bool {
        tracing::info!(
            "{destination} exists (e-tag {:?}), {} with {source}",
            existing.e_tag(),
            if self.no_clobber { "not replacing" } else { "replacing" }
        );
        !self.no_clobber
    }

    fn report_progress(&self, bytes: u64) {
        tracing::debug!("{} committed", ByteUnit::display(bytes));
    }

    fn report_completion(&self, result: Result<(), &aws_s3_transfer_unit::error::Error>) {
        if let Err(err) = result {
            tracing::warn!("work unit failed: {err}");
        }
    }
}

async fn do_upload(args: Args) -> Result<(), BoxError> {
    let data = Bytes::from(tokio::fs::read(&args.source).await?);
    let total_length = data.len() as u64;

    let config = aws_s3_transfer_unit::from_env()
        .single_request_threshold(args.single_request_threshold)
        .load()
        .await;
    let client = aws_s3_transfer_unit::Client::new(config);

    let mut properties = ObjectProperties::new();
    properties.set_content_type(args.content_type.clone());

    let mut builder = TransferJob::builder()
        .source(args.source.as_path())
        .bucket(args.dest.bucket.clone())
        .key(args.dest.key.clone())
        .total_length(total_length)
        .properties(properties)
        .force_overwrite(args.force)
        .controller(Arc::new(CliController {
            no_clobber: args.no_clobber,
        }));
    if let Some(path) = &args.journal {
        let journal = FileJournal::new(path);
        if let Some(snapshot) = journal.load().await? {
            tracing::info!(
                "resuming from {}: {} of {total_length} bytes committed",
                path.display(),
                snapshot.bytes_transferred()
            );
            builder = builder.resume_from(snapshot);
        }
        builder = builder.journal(Arc::new(journal));
    }
    let job = builder.build()?;

    let start = time::Instant::now();
    if !job.is_complete().await {
        let lease = client.buffer_pool().acquire().await?;
        job.stage_chunk(DataChunk::new(0, data).with_lease(lease))
            .await?;
    }
    client.start(job)?.join().await?;
    let elapsed = start.elapsed();

    println!(
        "uploaded {total_length} bytes ({}) to s3://{}/{} in {elapsed:?}",
        ByteUnit::display(total_length),
        args.dest.bucket,
        args.dest.key
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    if let Err(ref err) = do_upload(args).await {
        tracing::error!("transfer failed: {}", DisplayErrorContext(err.as_ref()));
    }

    Ok(())
}
