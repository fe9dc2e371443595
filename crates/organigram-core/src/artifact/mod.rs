mod builder;
mod writer;

pub use builder::{
    build_artifacts, file_key, location_projection, slugify, ArtifactSet, Directory,
    DirectoryHeader, FullEntityRecord, IndexEntry, OrganizationArtifact,
};
pub use writer::{ArtifactWriter, DIRECTORY_FILE, ENRICHMENT_FILE, INDEX_FILE, ORGANIZATIONS_DIR};
