/// Combines several `Property<T>::watch()` streams into one stream that
/// emits `self.clone()` whenever any named field changes.
///
/// # Example
/// ```ignore
/// impl Service {
///     pub fn watch(&self) -> impl Stream<Item = Self> + Send {
///         watch_all!(self, state, connectable, priority)
///     }
/// }
/// ```
#[macro_export]
macro_rules! watch_all {
    ($self:expr, $($source:ident),+ $(,)?) => {
        {
            use ::futures::StreamExt;

            let cloned = $self.clone();
            let streams: Vec<::futures::stream::BoxStream<'_, ()>> = vec![
                $($self.$source.watch().map(|_| ()).boxed(),)+
            ];
            ::futures::stream::select_all(streams).map(move |_| cloned.clone())
        }
    };
}
