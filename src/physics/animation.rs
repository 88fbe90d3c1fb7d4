use crate::graph::GraphSnapshot;

use super::{ForceSimulation, SimulationState};

/// Whatever drives frames (a window's repaint request, a timer in tests).
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// One tick plus one render per frame; the next frame is only requested while the layout moves.
#[derive(Debug, Default)]
pub struct AnimationLoop {
    frames: u64,
}

impl AnimationLoop {
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Returns `false` once the simulation is destroyed; nothing is ticked, rendered or scheduled then.
    pub fn run_frame(
        &mut self,
        simulation: &mut ForceSimulation,
        delta_seconds: f32,
        scheduler: &mut dyn FrameScheduler,
        render: impl FnOnce(&GraphSnapshot),
    ) -> bool {
        if simulation.state() == SimulationState::Destroyed {
            return false;
        }

        let moved = simulation.tick(delta_seconds);
        render(simulation.snapshot());
        self.frames += 1;

        if moved || simulation.is_dragging() {
            scheduler.request_frame();
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Link, Node};
    use crate::settings::Settings;

    #[derive(Default)]
    struct CountingScheduler {
        requests: usize,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&mut self) {
            self.requests += 1;
        }
    }

    fn simulation() -> ForceSimulation {
        let mut simulation = ForceSimulation::new(&Settings::default(), 400.0, 400.0);
        simulation
            .initialize(GraphSnapshot::new(
                [Node::document("a", "a", None), Node::document("b", "b", None)],
                [Link::explicit_reference("a", "b", 1.0)],
                1,
            ))
            .unwrap();
        simulation
    }

    #[test]
    fn moving_layout_keeps_requesting_frames() {
        let mut simulation = simulation();
        let mut animation = AnimationLoop::default();
        let mut scheduler = CountingScheduler::default();
        let mut rendered = 0;

        for _ in 0..3 {
            assert!(animation.run_frame(&mut simulation, 1.0 / 60.0, &mut scheduler, |_| {
                rendered += 1;
            }));
        }

        assert_eq!(rendered, 3);
        assert_eq!(animation.frames(), 3);
        assert_eq!(scheduler.requests, 3);
    }

    #[test]
    fn settled_layout_renders_without_scheduling() {
        let mut simulation = simulation();
        while simulation.tick(1.0 / 60.0) {}
        let mut animation = AnimationLoop::default();
        let mut scheduler = CountingScheduler::default();

        assert!(animation.run_frame(&mut simulation, 1.0 / 60.0, &mut scheduler, |_| {}));
        assert_eq!(animation.frames(), 1);
        assert_eq!(scheduler.requests, 0);
    }

    #[test]
    fn no_frames_after_destroy() {
        let mut simulation = simulation();
        let mut animation = AnimationLoop::default();
        let mut scheduler = CountingScheduler::default();

        animation.run_frame(&mut simulation, 1.0 / 60.0, &mut scheduler, |_| {});
        simulation.destroy();
        let frames = animation.frames();
        let requests = scheduler.requests;

        let mut rendered = 0;
        for _ in 0..5 {
            assert!(!animation.run_frame(&mut simulation, 1.0 / 60.0, &mut scheduler, |_| {
                rendered += 1;
            }));
        }

        assert_eq!(rendered, 0);
        assert_eq!(animation.frames(), frames);
        assert_eq!(scheduler.requests, requests);
    }
}
