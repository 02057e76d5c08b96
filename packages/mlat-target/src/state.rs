//! state.rs — the target's current position, shared between the updater
//! loop (single writer) and the RPC handlers (many readers).

use mlat_types::sync::FairRwLock;
use mlat_types::Vec3;

pub struct TargetPoint {
    position: FairRwLock<Vec3>,
}

impl TargetPoint {
    pub fn new(start: Vec3) -> Self {
        Self {
            position: FairRwLock::new(start),
        }
    }

    pub fn position(&self) -> Vec3 {
        *self.position.read()
    }

    pub fn set_position(&self, new_position: Vec3) {
        *self.position.write() = new_position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn set_then_get() {
        let point = TargetPoint::new(Vec3::zero());
        point.set_position(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(point.position(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn concurrent_readers_see_whole_positions() {
        // The writer only ever publishes points on the x = y = z diagonal;
        // a torn read would break that.
        let point = Arc::new(TargetPoint::new(Vec3::zero()));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let point = point.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        let p = point.position();
                        assert_eq!(p.x, p.y);
                        assert_eq!(p.y, p.z);
                    }
                })
            })
            .collect();

        let writer = {
            let point = point.clone();
            thread::spawn(move || {
                for i in 0..1000 {
                    let v = i as f64;
                    point.set_position(Vec3::new(v, v, v));
                }
            })
        };

        writer.join().unwrap();
        for r in readers {
            r.join().unwrap();
        }
    }
}
