use jurusan_core::schema::ACADEMIC_SCORE_FIELDS;
use jurusan_core::{FeatureKind, FeatureSchema, RawRecord, Result};
use serde::{Deserialize, Serialize};

const SCIENCE_SUBJECTS: [&str; 4] = ["matematika", "fisika", "kimia", "biologi"];
const SOCIAL_SUBJECTS: [&str; 4] = ["sejarah", "geografi", "ekonomi", "sosiologi"];
const OVERALL_EXCLUDED: &str = "rata_rata_keseluruhan";

/// Score summary returned by the academic-record pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicAnalysis {
    pub overall_average: f64,
    pub science_average: f64,
    pub social_average: f64,
    /// "Saintek" when science outscores social subjects, else "Soshum"
    pub academic_strength: String,
}

/// Summarize the default-filled academic scores of `record`.
///
/// Returns `None` for schemas that do not carry the academic score fields.
pub fn analyze(schema: &FeatureSchema, record: &RawRecord) -> Result<Option<AcademicAnalysis>> {
    let has_all = ACADEMIC_SCORE_FIELDS
        .iter()
        .all(|name| schema.get(name).is_some_and(|f| f.kind != FeatureKind::Categorical));
    if !has_all {
        return Ok(None);
    }

    let values = schema.resolve(record)?;
    let score = |name: &str| {
        schema
            .position(name)
            .and_then(|i| values[i].as_number())
            .unwrap_or_default()
    };
    let overall = mean(
        ACADEMIC_SCORE_FIELDS
            .iter()
            .filter(|name| **name != OVERALL_EXCLUDED)
            .map(|name| score(name)),
    );
    let science = mean(SCIENCE_SUBJECTS.iter().map(|name| score(name)));
    let social = mean(SOCIAL_SUBJECTS.iter().map(|name| score(name)));

    Ok(Some(AcademicAnalysis {
        overall_average: round2(overall),
        science_average: round2(science),
        social_average: round2(social),
        academic_strength: if science > social { "Saintek" } else { "Soshum" }.to_string(),
    }))
}

fn mean(scores: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = scores.fold((0.0, 0usize), |(sum, n), x| (sum + x, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_science_strength() {
        let schema = FeatureSchema::academic_record();
        let record = RawRecord::from_value(json!({
            "jenis_kelamin": "Perempuan",
            "matematika": 90, "fisika": 88, "kimia": 86, "biologi": 84,
            "sejarah": 70, "geografi": 72, "ekonomi": 68, "sosiologi": 70
        }))
        .unwrap();

        let analysis = analyze(&schema, &record).unwrap().unwrap();
        assert_eq!(analysis.science_average, 87.0);
        assert_eq!(analysis.social_average, 70.0);
        assert_eq!(analysis.academic_strength, "Saintek");
        // 8 given scores + 8 defaults of 75, average excluded
        assert_eq!(analysis.overall_average, 76.75);
    }

    #[test]
    fn test_defaults_only_is_soshum() {
        let schema = FeatureSchema::academic_record();
        let record = RawRecord::from_value(json!({"jenis_kelamin": "Laki-laki"})).unwrap();
        let analysis = analyze(&schema, &record).unwrap().unwrap();
        assert_eq!(analysis.overall_average, 75.0);
        assert_eq!(analysis.academic_strength, "Soshum");
    }

    #[test]
    fn test_survey_schema_has_no_analysis() {
        let schema = FeatureSchema::student_survey();
        let record = RawRecord::from_value(json!({"jenis_kelamin": "Laki-laki"})).unwrap();
        assert_eq!(analyze(&schema, &record).unwrap(), None);
    }
}
