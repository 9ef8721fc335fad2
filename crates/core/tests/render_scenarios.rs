use cint_core::{analyze, AnalysisConfig, NumberingSystem, OutputMode, Score};

const TWO_VOICES: &str = "\
!!!COM: Anonymous
**kern\t**kern
*M4/4\t*M4/4
=1\t=1
4C\t4c
4D\t4B
4E\t4c
=2\t=2
1F\t1f
*-\t*-
";

const THREE_VOICES: &str = "\
**kern\t**kern\t**kern
4C\t4c\t4e
4D\t4d\t4f
*-\t*-\t*-
";

const TIED: &str = "\
**kern\t**kern
[2c\t4e
.\t4f
4c]\t4g
4r\t4a
*-\t*-
";

fn render(text: &str, config: &AnalysisConfig) -> String {
    let score = Score::parse(text).unwrap();
    let mut out = Vec::new();
    analyze(&score, config, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

fn with_mode(mode: OutputMode) -> AnalysisConfig {
    AnalysisConfig {
        mode,
        ..Default::default()
    }
}

#[test]
fn combination_adds_one_column_per_pair() {
    let output = render(TWO_VOICES, &AnalysisConfig::default());
    let expected = "\
!!!COM: Anonymous
**kern\t**cint\t**kern
*M4/4\t*\t*M4/4
=1\t=1\t=1
4C\t8 2 6\t4c
4D\t6 2 6\t4B
4E\t6 2 8\t4c
=2\t=2\t=2
1F\t.\t1f
*-\t*-\t*-
";
    assert_eq!(output, expected);
}

#[test]
fn combination_in_base_40() {
    let config = AnalysisConfig {
        numbering: NumberingSystem::Base40,
        ..Default::default()
    };
    let output = render(TWO_VOICES, &config);
    assert!(output.contains("4C\t40 6 29\t4c\n"));
    assert!(output.contains("4E\t28 5 40\t4c\n"));
}

#[test]
fn raw_output_lists_modules_only() {
    let mut config = AnalysisConfig::default();
    config.layout.raw = true;
    assert_eq!(render(TWO_VOICES, &config), "8 2 6\n6 2 6\n6 2 8\n");
}

#[test]
fn combination_pairs_every_voice_with_every_voice_above() {
    let output = render(THREE_VOICES, &AnalysisConfig::default());
    let expected = "\
**kern\t**cint\t**cint\t**kern\t**cint\t**kern
4C\t8 2 8\t10 2 10\t4c\t3 2 3\t4e
4D\t.\t.\t4d\t.\t4f
*-\t*-\t*-\t*-\t*-\t*-
";
    assert_eq!(output, expected);
}

#[test]
fn collapsed_lines_get_a_structural_placeholder() {
    let text = "**kern\t**kern\n2C\t2c\n.\t.\n4D\t4d\n4E\t4e\n*-\t*-\n";
    let expected = "\
**kern\t**cint\t**kern
2C\t8 2 8\t2c
.\t?\t.
4D\t8 2 8\t4d
4E\t.\t4e
*-\t*-\t*-
";
    assert_eq!(render(text, &AnalysisConfig::default()), expected);
}

#[test]
fn lattice_appends_a_single_column() {
    let output = render(TWO_VOICES, &with_mode(OutputMode::Lattice));
    let expected = "\
!!!COM: Anonymous
**kern\t**kern\t**cint
*M4/4\t*M4/4\t*
=1\t=1\t=1
4C\t4c\t8 2 6
4D\t4B\t6 2 6
4E\t4c\t6 2 8
=2\t=2\t=2
1F\t1f\t.
*-\t*-\t*-
";
    assert_eq!(output, expected);
}

#[test]
fn stacked_lattice_with_top_voice() {
    let mut config = with_mode(OutputMode::Lattice);
    config.module.top = true;
    config.decoration.harmonic_brackets = true;
    let output = render(TWO_VOICES, &config);
    assert!(output.contains("4C\t4c\t[8] 2 -2 [6]\n"));
}

#[test]
fn lattice_rows_join_adjacent_pairs() {
    let mut config = with_mode(OutputMode::Lattice);
    config.layout.rows = true;
    let expected = "\
**kern\t**kern\t**kern\t**cint
4C\t4c\t4e\t8 2 8 3 2 3
4D\t4d\t4f\t.
*-\t*-\t*-\t*-
";
    assert_eq!(render(THREE_VOICES, &config), expected);

    config.layout.raw = true;
    assert_eq!(render(THREE_VOICES, &config), "8 2 8\n3 2 3\n");
}

#[test]
fn interleaved_lattice_follows_each_lower_voice() {
    let output = render(THREE_VOICES, &with_mode(OutputMode::InterleavedLattice));
    let expected = "\
**kern\t**cint\t**kern\t**cint\t**kern
4C\t8 2 8\t4c\t3 2 3\t4e
4D\t.\t4d\t.\t4f
*-\t*-\t*-\t*-\t*-
";
    assert_eq!(output, expected);
}

#[test]
fn pitch_grid_restores_ties_in_kern() {
    let mut config = with_mode(OutputMode::PitchGrid);
    config.interval.chromatic = true;
    let expected = "**kern\t**kern\n[c\te\nc_\tf\nc]\tg\nr\ta\n*-\t*-\n";
    assert_eq!(render(TIED, &config), expected);
}

#[test]
fn pitch_grid_with_rhythm_columns() {
    let mut config = with_mode(OutputMode::PitchGrid);
    config.numbering = NumberingSystem::Base40;
    config.layout.rhythm = true;
    let expected = "\
**absq\t**bar\t**beat\t**b40\t**b40
0\t0\t1\t162\t174
1\t0\t2\t-162\t179
2\t0\t3\t-162\t185
3\t0\t4\t0\t191
*-\t*-\t*-\t*-\t*-
";
    assert_eq!(render(TIED, &config), expected);
}

#[test]
fn empty_input_produces_no_output() {
    assert_eq!(render("", &AnalysisConfig::default()), "");
}

#[test]
fn mismatched_field_counts_are_rejected() {
    assert!(Score::parse("**kern\t**kern\n4c\n*-\t*-\n").is_err());
}
