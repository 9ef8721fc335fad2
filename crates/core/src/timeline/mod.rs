use std::ops::Index;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::pitch::kern_to_base40;
use crate::score::Score;

static METER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\*M(\d+)/(\d+)").expect("meter pattern is valid"));
static INSTRUMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\*I"(.*)"#).expect("instrument pattern is valid"));

/// Mensural cut-C: the half note carries the beat.
const CUT_C: &str = "*met(C|)";

/// One voice's state at one synchronized timeline position.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchEvent {
    /// Base-40 pitch: `0` rest, positive attack, negative sustained pitch.
    pub pitch: i32,
    pub source_line: usize,
    /// Field index of the voice on its source line.
    pub voice_column: Option<usize>,
    pub measure: i32,
    /// Shared by an attack and every continuation of the same note.
    pub tie_group: u32,
    /// Meter-dependent factor turning quarter-note beats into metric beats.
    pub beat_scale: f64,
}

impl PitchEvent {
    pub fn rest(source_line: usize, measure: i32) -> Self {
        Self {
            pitch: 0,
            source_line,
            voice_column: None,
            measure,
            tie_group: 0,
            beat_scale: 1.0,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch == 0
    }

    pub fn is_attack(&self) -> bool {
        self.pitch > 0
    }

    pub fn is_sustain(&self) -> bool {
        self.pitch < 0
    }

    /// Sounding pitch regardless of attack state.
    pub fn magnitude(&self) -> i32 {
        self.pitch.abs()
    }
}

/// Ordered pitch events of one voice.
#[derive(Debug, Clone, Default)]
pub struct VoiceTimeline {
    events: Vec<PitchEvent>,
}

impl VoiceTimeline {
    pub fn events(&self) -> &[PitchEvent] {
        &self.events
    }

    pub fn get(&self, index: usize) -> Option<&PitchEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Index<usize> for VoiceTimeline {
    type Output = PitchEvent;

    fn index(&self, index: usize) -> &Self::Output {
        &self.events[index]
    }
}

/// Mapping between score tracks and compact voice indices.
#[derive(Debug, Clone, Default)]
pub struct VoiceMap {
    tracks: Vec<usize>,
    reverse: Vec<Option<usize>>,
    names: Vec<String>,
}

impl VoiceMap {
    /// Voices are the `**kern` spines, numbered left to right from 0.
    pub fn from_score(score: &Score) -> Self {
        let tracks = score.kern_tracks().to_vec();
        let mut reverse = vec![None; score.max_track() + 1];
        for (voice, track) in tracks.iter().enumerate() {
            reverse[*track] = Some(voice);
        }
        let mut names: Vec<String> = tracks.iter().map(|track| track.to_string()).collect();

        for line in score.lines() {
            if line.is_data() {
                break;
            }
            if !line.is_interpretation() {
                continue;
            }
            for (j, field) in line.fields().iter().enumerate() {
                if !line.is_kern(j) {
                    continue;
                }
                if let (Some(captures), Some(voice)) = (
                    INSTRUMENT.captures(field.text()),
                    reverse.get(field.track()).copied().flatten(),
                ) {
                    names[voice] = captures[1].to_string();
                }
            }
        }

        Self {
            tracks,
            reverse,
            names,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn voice_for_track(&self, track: usize) -> Option<usize> {
        self.reverse.get(track).copied().flatten()
    }

    /// True for the right-most voice, which has no voice after it to pair with.
    pub fn is_last_voice(&self, voice: usize) -> bool {
        voice + 1 == self.tracks.len()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Synchronized timelines of every voice in a score.
#[derive(Debug, Clone, Default)]
pub struct Timelines {
    voices: Vec<VoiceTimeline>,
    map: VoiceMap,
}

impl Timelines {
    /// Builds timelines from explicit per-voice pitch lists, one row per
    /// index. Useful for driving the module engine without a score.
    pub fn from_pitches(voices: &[Vec<i32>]) -> Self {
        let mut timelines: Vec<VoiceTimeline> = Vec::with_capacity(voices.len());
        for pitches in voices {
            let mut group = 0;
            let events = pitches
                .iter()
                .enumerate()
                .map(|(row, pitch)| {
                    if *pitch > 0 {
                        group += 1;
                    }
                    PitchEvent {
                        pitch: *pitch,
                        tie_group: group,
                        ..PitchEvent::rest(row, 0)
                    }
                })
                .collect();
            timelines.push(VoiceTimeline { events });
        }
        Self {
            voices: timelines,
            map: VoiceMap::default(),
        }
    }

    pub fn voice(&self, voice: usize) -> &VoiceTimeline {
        &self.voices[voice]
    }

    pub fn voices(&self) -> &[VoiceTimeline] {
        &self.voices
    }

    pub fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Number of synchronized rows; every voice has exactly this many events.
    pub fn rows(&self) -> usize {
        self.voices.first().map(VoiceTimeline::len).unwrap_or(0)
    }

    /// Score line a row was taken from.
    pub fn row_line(&self, row: usize) -> Option<usize> {
        self.voices.first()?.get(row).map(|event| event.source_line)
    }

    pub fn map(&self) -> &VoiceMap {
        &self.map
    }
}

/// Turns a parsed score into synchronized per-voice timelines.
#[derive(Debug)]
pub struct TimelineBuilder<'a> {
    score: &'a Score,
    map: VoiceMap,
    serial: u32,
}

impl<'a> TimelineBuilder<'a> {
    pub fn new(score: &'a Score) -> Self {
        Self {
            score,
            map: VoiceMap::from_score(score),
            serial: 0,
        }
    }

    pub fn build(mut self) -> Timelines {
        let score = self.score;
        let voices = self.map.len();
        debug!(voices, names = ?self.map.names(), "building voice timelines");
        let mut timelines = vec![VoiceTimeline::default(); voices];
        if voices == 0 {
            return Timelines {
                voices: timelines,
                map: self.map,
            };
        }

        let mut beat_scales = vec![1.0; score.max_track() + 1];
        let mut open_groups = vec![0u32; voices];
        let mut measure = 0;

        for line in score.lines() {
            let index = line.index();
            debug!(line = index, text = line.text(), "processing line");

            if line.is_barline() {
                if let Some(number) = score.measure_number(index) {
                    measure = number;
                }
                if line.token(0).contains("||") {
                    for timeline in timelines.iter_mut() {
                        timeline.events.push(PitchEvent::rest(index, measure));
                    }
                }
                continue;
            }

            if line.is_interpretation() {
                for field in line.fields() {
                    if let Some(scale) = meter_beat_scale(field.text()) {
                        if let Some(slot) = beat_scales.get_mut(field.track()) {
                            *slot = scale;
                        }
                    }
                }
                continue;
            }

            if !line.is_data() {
                continue;
            }

            let mut current: Vec<PitchEvent> =
                (0..voices).map(|_| PitchEvent::rest(index, measure)).collect();
            for (j, field) in line.fields().iter().enumerate() {
                if !line.is_kern(j) {
                    continue;
                }
                let Some(voice) = self.map.voice_for_track(field.track()) else {
                    continue;
                };
                let event = &mut current[voice];
                event.voice_column = Some(j);
                event.beat_scale = beat_scales.get(field.track()).copied().unwrap_or(1.0);
                let (pitch, group) = self.decode(index, j, open_groups[voice]);
                if pitch > 0 {
                    open_groups[voice] = group;
                }
                event.pitch = pitch;
                event.tie_group = group;
            }

            let previous_all_rests = timelines
                .iter()
                .all(|timeline| timeline.events.last().is_some_and(PitchEvent::is_rest));
            if only_rests(&current) && previous_all_rests {
                debug!(line = index, "collapsing repeated rest row");
                continue;
            }
            if all_sustained(&current) {
                debug!(line = index, "skipping sustained sonority");
                continue;
            }

            for (timeline, event) in timelines.iter_mut().zip(current) {
                timeline.events.push(event);
            }
        }

        Timelines {
            voices: timelines,
            map: self.map,
        }
    }

    /// Decodes field `j` of line `index` into a signed pitch and tie group.
    fn decode(&mut self, index: usize, j: usize, open_group: u32) -> (i32, u32) {
        let score = self.score;
        let line = score.line(index);
        let (token, continued) = if line.fields()[j].is_null() {
            match score.resolve_null(index, j) {
                Some((ref_line, ref_field)) => (score.line(ref_line).token(ref_field), true),
                None => return (0, self.next_serial()),
            }
        } else {
            (line.token(j), false)
        };

        if token.contains('r') {
            return (0, self.next_serial());
        }
        let Some(pitch) = kern_to_base40(token) else {
            return (0, self.next_serial());
        };
        if continued || token.contains('_') || token.contains(']') {
            (-pitch, open_group)
        } else {
            (pitch, self.next_serial())
        }
    }

    fn next_serial(&mut self) -> u32 {
        self.serial += 1;
        self.serial
    }
}

/// Beat scale declared by a meter interpretation, if the token is one.
pub fn meter_beat_scale(token: &str) -> Option<f64> {
    if token == CUT_C {
        return Some(2.0 / 4.0);
    }
    let captures = METER.captures(token)?;
    let top: u32 = captures[1].parse().ok()?;
    let bottom: u32 = captures[2].parse().ok()?;
    let mut scale = f64::from(bottom) / 4.0;
    if top % 3 == 0 && top > 3 && bottom > 1 {
        scale /= 3.0;
    }
    Some(scale)
}

fn only_rests(row: &[PitchEvent]) -> bool {
    row.iter().all(PitchEvent::is_rest)
}

/// Something sounds but nothing is freshly attacked.
fn all_sustained(row: &[PitchEvent]) -> bool {
    row.iter().any(|event| !event.is_rest()) && !row.iter().any(PitchEvent::is_attack)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(text: &str) -> Timelines {
        let score = Score::parse(text).unwrap();
        TimelineBuilder::new(&score).build()
    }

    fn pitches(timelines: &Timelines, voice: usize) -> Vec<i32> {
        timelines.voice(voice).events().iter().map(|e| e.pitch).collect()
    }

    #[test]
    fn decodes_attacks_sustains_and_rests() {
        let timelines = build("**kern\t**kern\n[4c\t4e\n4c]\t4f\n4r\t4g\n.\t.\n*-\t*-\n");
        assert_eq!(timelines.rows(), 3);
        assert_eq!(pitches(&timelines, 0), vec![162, -162, 0]);
        assert_eq!(pitches(&timelines, 1), vec![174, 179, 185]);
        assert_eq!(timelines.row_line(1), Some(2));
    }

    #[test]
    fn sustains_keep_their_tie_group() {
        let timelines = build("**kern\t**kern\n[2c\t4e\n.\t4f\n4c]\t4g\n4d\t4a\n*-\t*-\n");
        let voice = timelines.voice(0);
        assert_eq!(voice[0].tie_group, voice[1].tie_group);
        assert_eq!(voice[1].tie_group, voice[2].tie_group);
        assert_ne!(voice[2].tie_group, voice[3].tie_group);
        assert!(voice[1].is_sustain());
    }

    #[test]
    fn collapses_repeated_rests_and_pure_sustains() {
        let text = "**kern\t**kern\n4r\t4r\n4r\t4r\n2c\t2e\n.\t.\n4d\t4f\n*-\t*-\n";
        let timelines = build(text);
        assert_eq!(pitches(&timelines, 0), vec![0, 162, 168]);
        assert_eq!(pitches(&timelines, 1), vec![0, 174, 179]);
    }

    #[test]
    fn double_barline_inserts_a_rest_row() {
        let text = "**kern\t**kern\n4c\t4e\n=||\t=||\n4d\t4f\n*-\t*-\n";
        let timelines = build(text);
        assert_eq!(pitches(&timelines, 0), vec![162, 0, 168]);
        assert_eq!(timelines.row_line(1), Some(2));
    }

    #[test]
    fn tracks_measures_and_beat_scales() {
        let text = "**kern\t**kern\n*M6/8\t*M3/4\n=5\t=5\n4c\t4e\n*-\t*-\n";
        let timelines = build(text);
        let lower = &timelines.voice(0)[0];
        let upper = &timelines.voice(1)[0];
        assert_eq!(lower.measure, 5);
        assert!((lower.beat_scale - 2.0 / 3.0).abs() < 1e-9);
        assert!((upper.beat_scale - 1.0).abs() < 1e-9);
        assert_eq!(lower.voice_column, Some(0));
    }

    #[test]
    fn unknown_tokens_decode_as_rests() {
        let timelines = build("**kern\t**kern\n4c\t4e\n4xyz\t4f\n*-\t*-\n");
        assert_eq!(pitches(&timelines, 0), vec![162, 0]);
    }

    #[test]
    fn meter_scales() {
        assert_eq!(meter_beat_scale("*M4/4"), Some(1.0));
        assert_eq!(meter_beat_scale("*M3/2"), Some(0.5));
        assert_eq!(meter_beat_scale("*met(C|)"), Some(0.5));
        assert_eq!(meter_beat_scale("*M?/4"), None);
        assert_eq!(meter_beat_scale("*clefG2"), None);
    }

    #[test]
    fn voice_map_reads_instrument_names() {
        let score = Score::parse("**kern\t**kern\n*I\"Bassus\t*I\"Cantus\n4c\t4e\n*-\t*-\n").unwrap();
        let map = VoiceMap::from_score(&score);
        assert_eq!(map.names(), &["Bassus".to_string(), "Cantus".to_string()]);
        assert_eq!(map.voice_for_track(2), Some(1));
        assert!(map.is_last_voice(1));
    }
}
