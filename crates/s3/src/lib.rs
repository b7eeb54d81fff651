//! minx-s3: S3 SDK adapter for minx
//!
//! This crate implements the ObjectStore trait from minx-core on top of
//! aws-sdk-s3. It is the only crate that directly depends on the AWS SDK.

pub mod client;

pub use client::S3Client;
