use phf::phf_map;

/// Three-letter residue name to one-letter code, covering the twenty
/// standard amino acids plus common variant names seen in structure files.
static THREE_TO_ONE: phf::Map<&'static str, char> = phf_map! {
    "ALA" => 'A',
    "ARG" => 'R',
    "ASN" => 'N',
    "ASP" => 'D',
    "CYS" => 'C',
    "GLN" => 'Q',
    "GLU" => 'E',
    "GLY" => 'G',
    "HIS" => 'H',
    "ILE" => 'I',
    "LEU" => 'L',
    "LYS" => 'K',
    "MET" => 'M',
    "PHE" => 'F',
    "PRO" => 'P',
    "SER" => 'S',
    "THR" => 'T',
    "TRP" => 'W',
    "TYR" => 'Y',
    "VAL" => 'V',
    // Protonation-state and modified-residue aliases.
    "HSD" => 'H',
    "HSE" => 'H',
    "HSP" => 'H',
    "HID" => 'H',
    "HIE" => 'H',
    "HIP" => 'H',
    "MSE" => 'M',
    "CYX" => 'C',
};

/// Returns the one-letter code for a three-letter residue name, or `'X'` for
/// names not in the table.
pub fn one_letter(name: &str) -> char {
    THREE_TO_ONE
        .get(name.trim().to_ascii_uppercase().as_str())
        .copied()
        .unwrap_or('X')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_residues_map_to_expected_codes() {
        assert_eq!(one_letter("ALA"), 'A');
        assert_eq!(one_letter("TRP"), 'W');
        assert_eq!(one_letter("GLU"), 'E');
    }

    #[test]
    fn lookup_is_case_insensitive_and_trims() {
        assert_eq!(one_letter("gly"), 'G');
        assert_eq!(one_letter(" SER "), 'S');
    }

    #[test]
    fn variant_names_resolve() {
        assert_eq!(one_letter("HSE"), 'H');
        assert_eq!(one_letter("MSE"), 'M');
    }

    #[test]
    fn unknown_name_maps_to_x() {
        assert_eq!(one_letter("LIG"), 'X');
        assert_eq!(one_letter(""), 'X');
    }
}
