/// Raw cache row. Values are opaque JSON text at this layer; decoding happens
/// in the typed repository so a bad blob never fails the query itself.
pub struct CacheRow {
    pub key: String,
    pub value: String,
    pub updated_at: String,
}
