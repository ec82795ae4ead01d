//! Lazy, restartable iteration over a paginated content provider.

use futures::stream::{self, Stream, TryStreamExt};
use vaulty_core::models::{RunReport, SourceItem};
use vaulty_core::WorkflowError;
use vaulty_services::ContentProvider;

use crate::processor::ItemProcessor;
use crate::runner::ItemRunner;

pub struct PaginatedSource<'a> {
    provider: &'a dyn ContentProvider,
}

impl<'a> PaginatedSource<'a> {
    pub fn new(provider: &'a dyn ContentProvider) -> Self {
        Self { provider }
    }

    /// Every item of the provider, fetching pages of `per_page` only as the stream is
    /// consumed. Iteration ends after the first page that reports no further pages (or
    /// comes back empty). A failed page fetch ends the stream with
    /// [`WorkflowError::Listing`].
    pub fn items(&self, per_page: u32) -> impl Stream<Item = Result<SourceItem, WorkflowError>> + 'a {
        let provider = self.provider;

        let pages = stream::try_unfold(Some(1u32), move |next_page| async move {
            let Some(page) = next_page else {
                return Ok(None);
            };

            let listed = provider
                .list_page(page, per_page)
                .await
                .map_err(|source| WorkflowError::Listing { page, source })?;

            tracing::debug!(
                provider = %provider.name(),
                page,
                items = listed.items.len(),
                has_more = listed.has_more,
                "Source page fetched"
            );

            let next = (listed.has_more && !listed.items.is_empty()).then_some(page + 1);
            Ok::<_, WorkflowError>(Some((listed.items, next)))
        });

        pages
            .map_ok(|items| stream::iter(items.into_iter().map(Ok::<_, WorkflowError>)))
            .try_flatten()
    }

    /// Feed every item through `processor`, one at a time.
    ///
    /// Items already in the runner's ledger are skipped and item failures do not stop the
    /// iteration. Listing and ledger failures abort the run, as does cancelling the runner
    /// (checked before each item); everything processed before is already in the ledger.
    pub async fn run<P>(
        &self,
        per_page: u32,
        runner: &ItemRunner<'_>,
        processor: &P,
    ) -> Result<RunReport, WorkflowError>
    where
        P: ItemProcessor<SourceItem> + ?Sized,
    {
        let mut report = RunReport::default();
        let items = self.items(per_page);
        futures::pin_mut!(items);

        loop {
            runner.ensure_running(&report)?;
            let Some(item) = items.try_next().await? else {
                break;
            };
            runner.run_item(&item, processor, &mut report).await?;
        }

        tracing::info!(
            action = %runner.action(),
            container = %runner.container(),
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "Source run finished"
        );
        Ok(report)
    }
}
