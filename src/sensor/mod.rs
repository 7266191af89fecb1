pub mod mailbox;
pub mod poller;

pub use mailbox::SensorMailbox;
pub use poller::{HttpSource, MailboxSource, PollHandle, ReadingSource, SensorPoller};

use crate::agent::pipeline::{detect, SoilDetection};
use crate::error::AppError;
use crate::store::Store;

/// Run the fresh reading, if any, through soil detection.
///
/// The slot is cleared only after detection succeeds, so a failed lookup
/// can be retried with the same reading.
pub async fn read_detection(
    mailbox: &SensorMailbox,
    store: &dyn Store,
) -> Result<Option<SoilDetection>, AppError> {
    let Some((seq, reading)) = mailbox.peek_fresh() else {
        return Ok(None);
    };
    let detection = detect(store, &reading).await?;
    mailbox.clear_if(seq);
    Ok(Some(detection))
}
