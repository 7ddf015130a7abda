use bevy::prelude::*;

use crate::{
    assets::{
        VdbAssets,
        VdbFrameChanged,
    },
    settings::VdbPrincipledSettings,
    volume::VdbVolume,
};


/// Drives the frame index of the [`VdbAssets`] on the same entity.
///
/// Playback length and rate come from the density volume.
#[derive(Component, Clone, Debug, Reflect)]
#[reflect(Component)]
pub struct VdbSequencePlayer {
    pub playing: bool,
    pub looping: bool,
    pub speed: f32,
    /// Playhead in frames.
    position: f32,
    current_frame: Option<u32>,
}

impl Default for VdbSequencePlayer {
    fn default() -> Self {
        Self {
            playing: true,
            looping: true,
            speed: 1.0,
            position: 0.0,
            current_frame: None,
        }
    }
}

impl VdbSequencePlayer {
    pub fn paused() -> Self {
        Self {
            playing: false,
            ..default()
        }
    }

    pub fn current_frame(&self) -> Option<u32> {
        self.current_frame
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    /// Moves the playhead; the change is published on the next advance.
    pub fn seek(&mut self, frame_index: u32) {
        self.position = frame_index as f32;
    }

    /// Advances the playhead by `delta` seconds and returns the frame index when it
    /// differs from the last published one.
    pub fn advance(&mut self, delta: f32, frame_count: u32, frame_rate: f32) -> Option<u32> {
        if frame_count == 0 || frame_rate <= 0.0 {
            return None;
        }

        let length = frame_count as f32;

        if self.playing {
            self.position += delta * self.speed * frame_rate;
        }

        if self.looping {
            self.position = self.position.rem_euclid(length);
        } else if self.position >= length || self.position < 0.0 {
            self.position = self.position.clamp(0.0, length - 1.0);
            self.playing = false;
        }

        let frame_index = (self.position.floor() as u32).min(frame_count - 1);
        if self.current_frame == Some(frame_index) {
            return None;
        }

        self.current_frame = Some(frame_index);
        Some(frame_index)
    }
}


pub fn advance_sequence_players(
    time: Res<Time>,
    settings: Res<VdbPrincipledSettings>,
    volume_assets: Res<Assets<VdbVolume>>,
    mut players: Query<(Entity, &mut VdbSequencePlayer, &VdbAssets)>,
    mut frame_changed: EventWriter<VdbFrameChanged>,
) {
    let delta = time.delta_secs();

    for (source, mut player, assets) in &mut players {
        let Some(density) = assets
            .density
            .as_ref()
            .and_then(|handle| volume_assets.get(handle))
        else {
            continue;
        };

        let frame_rate = density.frame_rate().unwrap_or(settings.default_frame_rate);

        if let Some(frame_index) = player.advance(delta, density.frame_count(), frame_rate) {
            debug!(?source, frame_index, "vdb sequence frame changed");
            frame_changed.write(VdbFrameChanged {
                source,
                frame_index,
            });
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_advance_publishes_frame_zero() {
        let mut player = VdbSequencePlayer::default();

        assert_eq!(player.advance(0.0, 10, 24.0), Some(0));
        assert_eq!(player.advance(0.0, 10, 24.0), None);
    }

    #[test]
    fn advances_by_frame_rate() {
        let mut player = VdbSequencePlayer::default();
        player.advance(0.0, 10, 10.0);

        assert_eq!(player.advance(0.25, 10, 10.0), Some(2));
        assert_eq!(player.advance(0.01, 10, 10.0), None);
        assert_eq!(player.advance(0.1, 10, 10.0), Some(3));
    }

    #[test]
    fn loops_past_the_end() {
        let mut player = VdbSequencePlayer::default();
        player.advance(0.0, 4, 1.0);

        assert_eq!(player.advance(5.5, 4, 1.0), Some(1));
        assert!(player.playing);
    }

    #[test]
    fn clamps_and_stops_without_looping() {
        let mut player = VdbSequencePlayer {
            looping: false,
            ..default()
        };
        player.advance(0.0, 4, 1.0);

        assert_eq!(player.advance(10.0, 4, 1.0), Some(3));
        assert!(!player.playing);
        assert_eq!(player.advance(1.0, 4, 1.0), None);
    }

    #[test]
    fn seek_publishes_while_paused() {
        let mut player = VdbSequencePlayer::paused();
        assert_eq!(player.advance(1.0, 8, 24.0), Some(0));

        player.seek(5);
        assert_eq!(player.advance(1.0, 8, 24.0), Some(5));
        assert_eq!(player.current_frame(), Some(5));
    }

    #[test]
    fn empty_sequence_never_publishes() {
        let mut player = VdbSequencePlayer::default();

        assert_eq!(player.advance(1.0, 0, 24.0), None);
        assert_eq!(player.advance(1.0, 4, 0.0), None);
    }
}
