#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use sqlvec_core::marshal::serialize_f32;
use sqlvec_core::{VecDb, VectorColumn, VectorEntry};

pub const DIM: usize = 384;

/// Generate a random DIM-sized unit-normalized vector.
pub fn random_unit_vector(rng: &mut StdRng) -> Vec<f32> {
    let mut v: Vec<f32> = (0..DIM).map(|_| rng.gen::<f32>() - 0.5).collect();
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}

/// Seed an in-memory DB with a `vec0` table `items(embedding float[DIM])`
/// holding `n` random unit vectors. Returns the DB and the vectors.
pub fn seed_db(n: usize) -> (VecDb, Vec<Vec<f32>>) {
    let mut rng = StdRng::seed_from_u64(42);
    let db = VecDb::open(":memory:").expect("failed to open in-memory DB");
    db.create_vector_table("items", &VectorColumn::float32("embedding", DIM), &[])
        .expect("create table failed");

    let vectors: Vec<Vec<f32>> = (0..n).map(|_| random_unit_vector(&mut rng)).collect();
    let entries: Vec<VectorEntry> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| VectorEntry::new(i as i64 + 1, serialize_f32(v)))
        .collect();
    db.insert_vectors_batch("items", "embedding", &entries)
        .expect("seed insert failed");

    (db, vectors)
}
