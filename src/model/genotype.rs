//! Numeric recoding rules for the text-valued biospecimen columns.

pub const BELOW_DETECTION_LIMIT: &str = "below detection limit";

/// Column-independent sentinel text with a fixed numeric meaning.
pub fn sentinel_value(text: &str) -> Option<f64> {
    match text {
        BELOW_DETECTION_LIMIT => Some(0.0),
        // CSF hemoglobin saturates the assay
        ">12500 ng/ml" | ">12500ng/ml" => Some(12500.0),
        _ => None,
    }
}

pub const APOE_ALLELES: [&str; 3] = ["e2", "e3", "e4"];

/// Number of times `allele` occurs in a genotype such as `e3/e4`.
pub fn allele_count(genotype: Option<&str>, allele: &str) -> Option<f64> {
    genotype.map(|g| g.matches(allele).count() as f64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyNumber {
    Normal,
    Changed,
    NotAssessed,
}

impl CopyNumber {
    pub fn parse(text: &str) -> Option<CopyNumber> {
        match text {
            "NormalCopyNumber" => Some(CopyNumber::Normal),
            "CopyNumberChange" => Some(CopyNumber::Changed),
            "NotAssessed" => Some(CopyNumber::NotAssessed),
            _ => None,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            CopyNumber::Normal => Some(0.0),
            CopyNumber::Changed => Some(1.0),
            CopyNumber::NotAssessed => None,
        }
    }
}

const BASES: [char; 4] = ['A', 'C', 'G', 'T'];

/// Per-SNP nucleotide weights learned from the genotypes observed in one column.
///
/// Observed bases are walked in A < C < G < T order; the first gets -1/2 and
/// each following base one more, so a biallelic SNP encodes as -1, 0, +1 for
/// the homozygous minor, heterozygous and homozygous major genotypes.
#[derive(Debug, Clone, PartialEq)]
pub struct SnpEncoding {
    weights: [Option<f64>; 4],
    code: String,
}

impl SnpEncoding {
    pub fn learn<'a, I>(genotypes: I) -> SnpEncoding
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = [0usize; 4];
        for genotype in genotypes {
            for (slot, base) in BASES.iter().enumerate() {
                seen[slot] += genotype.matches(*base).count();
            }
        }

        let mut weights = [None; 4];
        let mut code = String::new();
        let mut next = -0.5f64;
        for (slot, base) in BASES.iter().enumerate() {
            if seen[slot] == 0 {
                continue;
            }
            code.push(if next < 0.0 { '-' } else { '+' });
            code.push(*base);
            weights[slot] = Some(next);
            next += 1.0;
        }
        SnpEncoding { weights, code }
    }

    /// Polymorphism label such as `-C+T`.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn weight(&self, base: char) -> Option<f64> {
        BASES
            .iter()
            .position(|&b| b == base)
            .and_then(|slot| self.weights[slot])
    }

    /// Sum of both allele weights for a `X/Y` genotype.
    pub fn encode(&self, genotype: &str) -> Option<f64> {
        let mut chars = genotype.chars();
        let first = chars.next()?;
        let second = chars.nth(1)?;
        Some(self.weight(first)? + self.weight(second)?)
    }

    pub fn column_name(&self, snp: &str) -> String {
        match self.code() {
            "" => format!("SNP {snp}"),
            code => format!("SNP {snp} {code}"),
        }
    }
}

pub fn is_snp_column(name: &str) -> bool {
    name.starts_with("rs")
}

#[cfg(test)]
#[path = "../../tests/src_inline/model/genotype.rs"]
mod tests;
