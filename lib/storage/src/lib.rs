pub mod dataset;
pub mod model_store;

pub use dataset::{example_from_value, load_examples, DEFAULT_LABEL_FIELD};
pub use model_store::{decode_artifact, encode_artifact, ArtifactMetadata, ModelStore, FORMAT_VERSION};
