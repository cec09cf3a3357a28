//! Magnitude calculator
//!
//! Computes every stored impulse response's truncated magnitude spectrum on a
//! pool of worker threads. Work distribution is a single atomic cursor over a
//! fixed list of backing offsets: each worker claims the next index with a
//! compare-and-swap fetch-and-increment and exits once the cursor passes the
//! end. No locks, no condition variables.

use std::sync::atomic::{AtomicUsize, Ordering};

use rustfft::num_complex::Complex;

use crate::dsp::{magnitude_response, ForwardFft};
use crate::error::Result;
use crate::grid::HrirDataSet;

/// Shared view of the backing buffer for the worker threads.
///
/// Workers only ever touch the `ir_size`-long region at an offset they
/// claimed from the cursor; the work list holds each physical region exactly
/// once, so live accesses never overlap.
struct SharedIrs {
    ptr: *mut f64,
    len: usize,
}

unsafe impl Send for SharedIrs {}
unsafe impl Sync for SharedIrs {}

impl SharedIrs {
    /// # Safety
    ///
    /// `offset + len` must lie within the buffer and no two live slices may
    /// overlap.
    unsafe fn slice_mut(&self, offset: usize, len: usize) -> &mut [f64] {
        debug_assert!(offset + len <= self.len);
        std::slice::from_raw_parts_mut(self.ptr.add(offset), len)
    }
}

/// Backing offsets of every physical IR buffer, each exactly once.
///
/// Mirrored slots below `ev_start` alias storage owned by slots above it, so
/// walking `ev_start..` covers everything without repeats.
pub(crate) fn work_list(data: &HrirDataSet) -> Vec<usize> {
    let channels = data.channel_type.count();
    let mut offsets = Vec::new();
    for field in &data.fields {
        for elevation in &field.elevations[field.ev_start..] {
            for slot in &elevation.azimuths {
                for ti in 0..channels {
                    if let Some(offset) = slot.irs[ti] {
                        offsets.push(offset);
                    }
                }
            }
        }
    }
    offsets
}

/// Replace each claimed impulse response's leading samples with its magnitude
/// spectrum (`fft_size / 2 + 1` bins).
///
/// `done` counts completed items for progress display. One worker is always
/// valid and degrades to serial processing.
pub(crate) fn calculate_magnitudes(
    data: &mut HrirDataSet,
    workers: usize,
    done: &AtomicUsize,
) -> Result<()> {
    let fft_size = data.fft_size;
    let points = data.ir_points;
    let ir_size = data.ir_size;
    let bins = fft_size / 2 + 1;

    let offsets = work_list(data);
    let plan = ForwardFft::new(fft_size);

    let backing = data.backing_mut();
    let shared = SharedIrs {
        ptr: backing.as_mut_ptr(),
        len: backing.len(),
    };
    let cursor = AtomicUsize::new(0);

    std::thread::scope(|scope| {
        for _ in 0..workers.max(1) {
            let plan = plan.clone();
            let shared = &shared;
            let cursor = &cursor;
            let offsets = &offsets;
            scope.spawn(move || {
                let mut h = vec![Complex::new(0.0, 0.0); fft_size];
                loop {
                    // Claim the next index; on contention the failed exchange
                    // hands back the current value to recheck.
                    let mut idx = cursor.load(Ordering::Relaxed);
                    loop {
                        if idx >= offsets.len() {
                            return;
                        }
                        match cursor.compare_exchange_weak(
                            idx,
                            idx + 1,
                            Ordering::Relaxed,
                            Ordering::Relaxed,
                        ) {
                            Ok(_) => break,
                            Err(current) => idx = current,
                        }
                    }

                    // Safety: this offset was claimed through the cursor and
                    // appears exactly once in the work list.
                    let ir = unsafe { shared.slice_mut(offsets[idx], ir_size) };
                    for (dst, &src) in h.iter_mut().zip(ir[..points].iter()) {
                        *dst = Complex::new(src, 0.0);
                    }
                    for dst in h[points..].iter_mut() {
                        *dst = Complex::new(0.0, 0.0);
                    }
                    plan.process(&mut h);
                    magnitude_response(&h, &mut ir[..bins]);

                    done.fetch_add(1, Ordering::Relaxed);
                }
            });
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::layout::FieldLayout;
    use crate::grid::{ChannelType, HrirDataSet};

    fn impulse_data() -> HrirDataSet {
        let layout = FieldLayout {
            distance: 1.0,
            ev_base: -60.0,
            ev_step: 60.0,
            az_counts: vec![2, 4, 2],
            measured: vec![true, true, true],
        };
        let mut data =
            HrirDataSet::allocate(&[layout], ChannelType::Mono, 48000, 16, 33, 64, 0.09);
        for ei in 0..3 {
            for ai in 0..data.fields[0].elevations[ei].azimuths.len() {
                let index = data.fields[0].elevations[ei].azimuths[ai].index;
                let offset = data.channel_offset(0, index);
                data.ir_mut(offset)[0] = 1.0;
                data.fields[0].elevations[ei].azimuths[ai].irs[0] = Some(offset);
            }
        }
        data
    }

    #[test]
    fn impulse_spectra_are_flat() {
        let mut data = impulse_data();
        let done = AtomicUsize::new(0);
        calculate_magnitudes(&mut data, 2, &done).unwrap();
        assert_eq!(done.load(Ordering::Relaxed), 8);

        let bins = data.fft_size / 2 + 1;
        let offsets = work_list(&data);
        for offset in offsets {
            for &mag in &data.ir(offset)[..bins] {
                assert!((mag - 1.0).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn worker_count_does_not_change_spectra() {
        let mut serial = impulse_data();
        let mut parallel = impulse_data();
        calculate_magnitudes(&mut serial, 1, &AtomicUsize::new(0)).unwrap();
        calculate_magnitudes(&mut parallel, 4, &AtomicUsize::new(0)).unwrap();

        for offset in work_list(&serial) {
            assert_eq!(serial.ir(offset), parallel.ir(offset));
        }
    }
}
