use nalgebra::Point3;

/// Euclidean distance between two atom positions in Angstroms.
pub fn atom_distance(a: &Point3<f64>, b: &Point3<f64>) -> f64 {
    (a - b).norm()
}
