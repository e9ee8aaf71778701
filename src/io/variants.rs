use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::Context;
use log::info;

use crate::data_structs::{
    VariantList,
    VariantRecord,
};

/// Reads a headerless, tab-separated variant list with columns chromosome,
/// position, reference allele, alternate allele, variant identity.
///
/// Row order is preserved; it defines the tensor row of each variant.
pub fn read_variant_list(path: &Path) -> anyhow::Result<VariantList> {
    let file = File::open(path)
        .with_context(|| format!("opening variant list {}", path.display()))?;
    let variants = variant_list_from_reader(file)
        .with_context(|| format!("parsing variant list {}", path.display()))?;
    info!("Read {} variants from {}", variants.len(), path.display());
    Ok(variants)
}

pub fn variant_list_from_reader<R: Read>(reader: R) -> anyhow::Result<VariantList> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(b'\t')
        .from_reader(reader);

    csv_reader
        .deserialize::<VariantRecord>()
        .enumerate()
        .map(|(line, record)| record.with_context(|| format!("line {}", line + 1)))
        .collect()
}
