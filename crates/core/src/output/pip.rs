use super::{push_entries, EntryStyle};
use crate::models::{Manifest, ManifestFormat, ResolvedModule};

const PIP_STYLE: EntryStyle = EntryStyle {
    prefix: "",
    pin: "==",
};

/// Flat `name==version` list
pub(super) fn render(modules: &[ResolvedModule], include_comments: bool) -> Manifest {
    let mut manifest = Manifest {
        format: ManifestFormat::Pip,
        ..Default::default()
    };
    push_entries(&mut manifest, modules, include_comments, &PIP_STYLE);
    manifest
}
