use std::cell::UnsafeCell;
use rand_xoshiro::Xoshiro256Plus;
use rand::distributions::{Distribution, Standard};
use rand::{FromEntropy, Rng};

thread_local!(static RNG: UnsafeCell<Xoshiro256Plus> = UnsafeCell::new(Xoshiro256Plus::from_entropy()));

pub fn rand<T>() -> T where Standard: Distribution<T> {
    RNG.with(|rng_cell| {
        unsafe {
            let rng: &mut Xoshiro256Plus = &mut *rng_cell.get();
            rng.gen()
        }
    })
}
