//! The standard SVWS rollover steps, in canonical execution order.

use super::MigrationStep;
use crate::transform::TransformKind;

/// Key of the academic-year segment step.
pub const SEGMENT_STEP_KEY: &str = "schuljahresabschnitte";

/// Anchor table holding the academic-year segments.
pub const SEGMENT_TABLE: &str = "Schuljahresabschnitte";

/// Year column of the anchor table.
pub const SEGMENT_YEAR_COLUMN: &str = "Jahr";

const DEFAULT_SAMPLE_SIZE: usize = 5;

pub(super) const STANDARD_STEPS: &[MigrationStep] = &[
    MigrationStep {
        key: SEGMENT_STEP_KEY,
        description: "Academic-year segments: Jahr + 1 (descending, constraint-safe)",
        table: SEGMENT_TABLE,
        columns: &[SEGMENT_YEAR_COLUMN],
        transform: TransformKind::IntegerYearAddYear,
        anchor_column: Some(SEGMENT_YEAR_COLUMN),
        sample_size: 0,
    },
    MigrationStep {
        key: "schueler_dates",
        description: "Student core dates",
        table: "Schueler",
        columns: &[
            "Geburtsdatum",
            "Religionsabmeldung",
            "Religionsanmeldung",
            "Schulwechseldatum",
            "Aufnahmedatum",
            "Entlassdatum",
            "Anmeldedatum",
            "BeginnBildungsgang",
            "EndeEingliederung",
            "EndeAnschlussfoerderung",
        ],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_abschlussdatum",
        description: "Student graduation date string (DD.MM.YYYY)",
        table: "Schueler",
        columns: &["AbschlussDatum"],
        transform: TransformKind::FormattedDateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_jahre",
        description: "Student integer year fields",
        table: "Schueler",
        columns: &["JahrZuzug", "JahrWechsel_SI", "JahrWechsel_SII"],
        transform: TransformKind::IntegerYearAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_abgaenge",
        description: "Student departure dates",
        table: "SchuelerAbgaenge",
        columns: &["LSSchulEntlassDatum", "LSBeginnDatum"],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_lernabschnittsdaten",
        description: "Student learning-period dates",
        table: "SchuelerLernabschnittsdaten",
        columns: &[
            "DatumVon",
            "DatumBis",
            "Konferenzdatum",
            "ZeugnisDatum",
            "NPV_Datum",
            "NPAA_Datum",
            "NPBQ_Datum",
            "DatumFHR",
        ],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_leistungsdaten",
        description: "Student performance-warning date",
        table: "SchuelerLeistungsdaten",
        columns: &["Warndatum"],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_einzelleistungen",
        description: "Student individual-performance date",
        table: "SchuelerEinzelleistungen",
        columns: &["Datum"],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_fehlstunden",
        description: "Student absence date",
        table: "SchuelerFehlstunden",
        columns: &["Datum"],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_vermerke",
        description: "Student remark date",
        table: "SchuelerVermerke",
        columns: &["Datum"],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_merkmale",
        description: "Student characteristic date range",
        table: "SchuelerMerkmale",
        columns: &["DatumVon", "DatumBis"],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_foerderempfehlungen",
        description: "Student support-recommendation dates",
        table: "SchuelerFoerderempfehlungen",
        columns: &[
            "DatumAngelegt",
            "DatumAenderungSchild",
            "DatumAenderungSchildWeb",
            "Zeitrahmen_von_Datum",
            "Zeitrahmen_bis_Datum",
        ],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
    MigrationStep {
        key: "schueler_allgadr",
        description: "Student address contract dates",
        table: "Schueler_AllgAdr",
        columns: &["Vertragsbeginn", "Vertragsende"],
        transform: TransformKind::DateAddYear,
        anchor_column: None,
        sample_size: DEFAULT_SAMPLE_SIZE,
    },
];
