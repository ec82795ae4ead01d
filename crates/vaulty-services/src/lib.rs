//! Vaulty Services Layer
//!
//! Adapters for the remote collaborators of the bulk workflows: the cold-storage archive,
//! the topic/queue notification channel and the upstream content providers. The workflow
//! code in `vaulty-worker` depends only on the traits defined here.

pub mod archive;
#[cfg(feature = "aws")]
pub mod aws;
#[cfg(feature = "aws")]
pub mod aws_error;
pub mod notification;
pub mod provider;

pub use archive::ArchiveService;
#[cfg(feature = "aws")]
pub use archive::GlacierArchive;
#[cfg(feature = "aws")]
pub use aws::{load_sdk_config, AwsServices};
pub use notification::{channel_name, publish_policy, NotificationService, QueueMessage};
#[cfg(feature = "aws")]
pub use notification::SnsSqsNotifier;
pub use provider::{BucketProvider, ContentProvider};
#[cfg(feature = "vimeo")]
pub use provider::VimeoProvider;
