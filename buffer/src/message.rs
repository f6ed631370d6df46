//! Work items and the end-of-stream marker.

/// A value travelling through a shared buffer between workers.
///
/// The end marker is its own variant, so no payload value can ever be
/// mistaken for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message<T> {
    /// A work item.
    Item(T),
    /// No more items will follow.
    End,
}

impl<T> Message<T> {
    /// Returns true for the end marker.
    pub fn is_end(&self) -> bool {
        matches!(self, Message::End)
    }

    /// Returns the payload, or `None` for the end marker.
    pub fn into_item(self) -> Option<T> {
        match self {
            Message::Item(item) => Some(item),
            Message::End => None,
        }
    }
}

impl<T> From<T> for Message<T> {
    fn from(item: T) -> Self {
        Message::Item(item)
    }
}
