//! Built-in clinical catalogue: header aliases, reference ranges, priors,
//! and the observation -> cause edge table.

use crate::ranges::{Bounds, ReferenceSpec};

/// Lower-cased normalized header -> canonical parameter name.
pub const ALIASES: &[(&str, &str)] = &[
    ("hemoglobin", "Hemoglobin"),
    ("haemoglobin", "Hemoglobin"),
    ("hb", "Hemoglobin"),
    ("hgb", "Hemoglobin"),
    ("rbc", "RBC"),
    ("rbc_count", "RBC"),
    ("total_rbc_count", "RBC"),
    ("pcv", "Hematocrit"),
    ("hct", "Hematocrit"),
    ("hematocrit", "Hematocrit"),
    ("haematocrit", "Hematocrit"),
    ("packed_cell_volume", "Hematocrit"),
    ("mcv", "MCV"),
    ("mch", "MCH"),
    ("mchc", "MCHC"),
    ("rdw", "RDW"),
    ("rdw_cv", "RDW"),
    ("wbc", "WBC"),
    ("wbc_count", "WBC"),
    ("total_wbc_count", "WBC"),
    ("tlc", "WBC"),
    ("total_leucocyte_count", "WBC"),
    ("platelets", "Platelets"),
    ("platelet", "Platelets"),
    ("platelet_count", "Platelets"),
    ("plt", "Platelets"),
    ("neutrophils", "Neutrophils"),
    ("neutrophil", "Neutrophils"),
    ("lymphocytes", "Lymphocytes"),
    ("lymphocyte", "Lymphocytes"),
    ("eosinophils", "Eosinophils"),
    ("monocytes", "Monocytes"),
    ("basophils", "Basophils"),
    ("esr", "ESR"),
    ("glucose_fasting", "Glucose_Fasting"),
    ("fasting_glucose", "Glucose_Fasting"),
    ("fasting_blood_sugar", "Glucose_Fasting"),
    ("fbs", "Glucose_Fasting"),
    ("hba1c", "HbA1c"),
    ("a1c", "HbA1c"),
    ("glycated_hemoglobin", "HbA1c"),
    ("total_cholesterol", "Total_Cholesterol"),
    ("cholesterol_total", "Total_Cholesterol"),
    ("cholesterol", "Total_Cholesterol"),
    ("hdl", "HDL"),
    ("hdl_cholesterol", "HDL"),
    ("ldl", "LDL"),
    ("ldl_cholesterol", "LDL"),
    ("vldl", "VLDL"),
    ("triglycerides", "Triglycerides"),
    ("triglyceride", "Triglycerides"),
    ("tg", "Triglycerides"),
    ("creatinine", "Creatinine"),
    ("serum_creatinine", "Creatinine"),
    ("urea_bun", "Urea_BUN"),
    ("urea", "Urea_BUN"),
    ("bun", "Urea_BUN"),
    ("blood_urea_nitrogen", "Urea_BUN"),
    ("crp", "CRP"),
    ("c_reactive_protein", "CRP"),
    ("sgot", "SGOT"),
    ("ast", "SGOT"),
    ("sgpt", "SGPT"),
    ("alt", "SGPT"),
    ("alp", "ALP"),
    ("alkaline_phosphatase", "ALP"),
    ("total_bilirubin", "Total_Bilirubin"),
    ("bilirubin_total", "Total_Bilirubin"),
    ("albumin", "Albumin"),
    ("tsh", "TSH"),
    ("sodium", "Sodium"),
    ("na", "Sodium"),
    ("potassium", "Potassium"),
    ("k", "Potassium"),
    ("calcium", "Calcium"),
    ("ferritin", "Ferritin"),
    ("serum_iron", "Serum_Iron"),
    ("iron", "Serum_Iron"),
    ("vitamin_b12", "Vitamin_B12"),
    ("b12", "Vitamin_B12"),
];

/// Tokens upper-cased when building a canonical name for an unknown header.
pub const ACRONYMS: &[&str] = &[
    "hdl", "ldl", "vldl", "crp", "hba1c", "rbc", "wbc", "mcv", "mch", "mchc", "rdw", "esr", "tsh",
    "alp", "sgot", "sgpt", "bun", "ggt", "ast", "alt",
];

/// Keys that describe the report rather than a measurement.
pub const METADATA_KEYS: &[&str] = &["age", "gender", "patient_id", "filename", "report_date"];

/// Parameters whose status flags feed observations directly.
pub const KEY_PARAMETERS: &[&str] = &[
    "Hemoglobin",
    "Platelets",
    "MCV",
    "RDW",
    "WBC",
    "LDL",
    "Total_Cholesterol",
    "Triglycerides",
    "HDL",
    "Creatinine",
    "CRP",
    "Glucose_Fasting",
    "HbA1c",
    "Neutrophils",
    "Lymphocytes",
];

/// Phrases that must never reach a persisted document.
pub const FORBIDDEN_TERMS: &[&str] = &[
    "prescribe",
    "dosage",
    "dose",
    "recommend medication",
    "start metformin",
    "start statin",
    "start insulin",
    "start aspirin",
];

/// Base prior per cause, fused as `score * (1 + prior)`.
pub const PRIORS: &[(&str, f64)] = &[
    ("Iron_Deficiency", 0.15),
    ("Viral_Infection", 0.1),
    ("Dietary_Dyslipidemia", 0.1),
    ("Insulin_Resistance", 0.1),
    ("Vitamin_B12_Deficiency", 0.05),
    ("Chronic_Disease", 0.05),
    ("Inflammation", 0.05),
];

/// `(source observation, relation, target cause, weight)` in evaluation order.
pub const EDGES: &[(&str, &str, &str, f64)] = &[
    ("Hemoglobin_LOW", "possible_cause", "Iron_Deficiency", 0.6),
    ("Hemoglobin_LOW", "possible_cause", "Blood_Loss", 0.5),
    ("Hemoglobin_LOW", "possible_cause", "Chronic_Disease", 0.4),
    ("Hemoglobin_LOW", "possible_cause", "Vitamin_B12_Deficiency", 0.3),
    ("Hemoglobin_HIGH", "associated_with", "Dehydration", 0.5),
    ("Hemoglobin_HIGH", "possible_cause", "Polycythemia_Vera", 0.3),
    ("Hemoglobin_HIGH", "possible_cause", "Chronic_Hypoxia", 0.3),
    ("MCV_LOW", "possible_cause", "Iron_Deficiency", 0.7),
    ("MCV_LOW", "possible_cause", "Thalassemia_Trait", 0.5),
    ("MCV_HIGH", "possible_cause", "Vitamin_B12_Deficiency", 0.7),
    ("MCV_HIGH", "possible_cause", "Folate_Deficiency", 0.6),
    ("MCV_HIGH", "associated_with", "Liver_Disease", 0.3),
    ("MCV_HIGH", "associated_with", "Alcohol_Use", 0.3),
    ("RDW_HIGH", "possible_cause", "Iron_Deficiency", 0.4),
    ("RDW_HIGH", "suggests", "Mixed_Nutritional_Deficiency", 0.4),
    ("Platelets_LOW", "possible_cause", "Immune_Thrombocytopenia", 0.5),
    ("Platelets_LOW", "possible_cause", "Bone_Marrow_Suppression", 0.4),
    ("Platelets_LOW", "associated_with", "Viral_Infection", 0.3),
    ("Platelets_HIGH", "possible_cause", "Reactive_Thrombocytosis", 0.5),
    ("Platelets_HIGH", "associated_with", "Inflammation", 0.3),
    ("Platelets_HIGH", "associated_with", "Iron_Deficiency", 0.2),
    ("WBC_HIGH", "possible_cause", "Bacterial_Infection", 0.5),
    ("WBC_HIGH", "possible_cause", "Inflammation", 0.4),
    ("WBC_LOW", "possible_cause", "Viral_Infection", 0.4),
    ("WBC_LOW", "possible_cause", "Bone_Marrow_Suppression", 0.4),
    ("Neutrophils_HIGH", "possible_cause", "Bacterial_Infection", 0.7),
    ("Neutrophils_HIGH", "associated_with", "Acute_Stress", 0.3),
    ("Lymphocytes_HIGH", "possible_cause", "Viral_Infection", 0.7),
    ("Eosinophils_HIGH", "possible_cause", "Allergic_Reaction", 0.6),
    ("Eosinophils_HIGH", "possible_cause", "Parasitic_Infection", 0.5),
    ("LDL_HIGH", "possible_cause", "Dietary_Dyslipidemia", 0.6),
    ("LDL_HIGH", "possible_cause", "Familial_Hypercholesterolemia", 0.4),
    ("Total_Cholesterol_HIGH", "possible_cause", "Dietary_Dyslipidemia", 0.5),
    ("Total_Cholesterol_HIGH", "associated_with", "Hypothyroidism", 0.2),
    ("Triglycerides_HIGH", "possible_cause", "Insulin_Resistance", 0.6),
    ("Triglycerides_HIGH", "possible_cause", "Dietary_Dyslipidemia", 0.4),
    ("HDL_LOW", "possible_cause", "Insulin_Resistance", 0.5),
    ("HDL_LOW", "associated_with", "Sedentary_Lifestyle", 0.4),
    ("Glucose_Fasting_HIGH", "possible_cause", "Diabetes_Mellitus", 0.7),
    ("Glucose_Fasting_HIGH", "possible_cause", "Insulin_Resistance", 0.6),
    ("HbA1c_HIGH", "possible_cause", "Diabetes_Mellitus", 0.8),
    ("Creatinine_HIGH", "possible_cause", "Chronic_Kidney_Disease", 0.6),
    ("Creatinine_HIGH", "associated_with", "Dehydration", 0.4),
    ("Urea_BUN_HIGH", "possible_cause", "Dehydration", 0.5),
    ("Urea_BUN_HIGH", "possible_cause", "Chronic_Kidney_Disease", 0.4),
    ("CRP_HIGH", "possible_cause", "Inflammation", 0.7),
    ("CRP_HIGH", "possible_cause", "Bacterial_Infection", 0.4),
    ("ESR_HIGH", "possible_cause", "Inflammation", 0.5),
    ("SGOT_HIGH", "possible_cause", "Liver_Injury", 0.6),
    ("SGPT_HIGH", "possible_cause", "Liver_Injury", 0.7),
    ("ALP_HIGH", "possible_cause", "Cholestasis", 0.6),
    ("Total_Bilirubin_HIGH", "possible_cause", "Cholestasis", 0.5),
    ("Total_Bilirubin_HIGH", "possible_cause", "Hemolysis", 0.3),
    ("TSH_HIGH", "possible_cause", "Hypothyroidism", 0.8),
    ("TSH_LOW", "possible_cause", "Hyperthyroidism", 0.8),
    ("Sodium_LOW", "possible_cause", "Fluid_Imbalance", 0.6),
    ("Potassium_HIGH", "possible_cause", "Chronic_Kidney_Disease", 0.4),
    ("Potassium_HIGH", "associated_with", "Sample_Hemolysis", 0.4),
    ("Ferritin_LOW", "possible_cause", "Iron_Deficiency", 0.9),
    ("Serum_Iron_LOW", "possible_cause", "Iron_Deficiency", 0.7),
    ("Vitamin_B12_LOW", "possible_cause", "Vitamin_B12_Deficiency", 0.9),
];

enum Row {
    Direct(&'static str, f64, f64, &'static str),
    BySex(&'static str, (f64, f64), (f64, f64), &'static str),
    Adult(&'static str, f64, f64, &'static str),
}

const RANGES: &[Row] = &[
    Row::BySex("Hemoglobin", (13.5, 17.5), (12.0, 15.5), "g/dL"),
    Row::BySex("RBC", (4.5, 5.9), (4.1, 5.1), "mill/cumm"),
    Row::BySex("Hematocrit", (41.0, 53.0), (36.0, 46.0), "%"),
    Row::Direct("MCV", 80.0, 100.0, "fL"),
    Row::Direct("MCH", 27.0, 33.0, "pg"),
    Row::Direct("MCHC", 32.0, 36.0, "g/dL"),
    Row::Direct("RDW", 11.5, 14.5, "%"),
    Row::Direct("WBC", 4.0, 11.0, "10^3/uL"),
    Row::Direct("Platelets", 150.0, 410.0, "10^3/uL"),
    Row::Direct("Neutrophils", 40.0, 75.0, "%"),
    Row::Direct("Lymphocytes", 20.0, 45.0, "%"),
    Row::Direct("Eosinophils", 1.0, 6.0, "%"),
    Row::Direct("Monocytes", 2.0, 10.0, "%"),
    Row::Direct("Basophils", 0.0, 2.0, "%"),
    Row::BySex("ESR", (0.0, 15.0), (0.0, 20.0), "mm/hr"),
    Row::Direct("Glucose_Fasting", 70.0, 100.0, "mg/dL"),
    Row::Direct("HbA1c", 4.0, 5.6, "%"),
    Row::Direct("Total_Cholesterol", 125.0, 200.0, "mg/dL"),
    Row::Direct("HDL", 40.0, 100.0, "mg/dL"),
    Row::Direct("LDL", 0.0, 130.0, "mg/dL"),
    Row::Direct("VLDL", 5.0, 40.0, "mg/dL"),
    Row::Direct("Triglycerides", 0.0, 150.0, "mg/dL"),
    Row::Direct("Urea_BUN", 7.0, 20.0, "mg/dL"),
    Row::BySex("Creatinine", (0.7, 1.3), (0.6, 1.1), "mg/dL"),
    Row::Direct("CRP", 0.0, 5.0, "mg/L"),
    Row::Direct("SGOT", 5.0, 40.0, "U/L"),
    Row::Direct("SGPT", 5.0, 40.0, "U/L"),
    Row::Direct("ALP", 40.0, 129.0, "U/L"),
    Row::Direct("Total_Bilirubin", 0.2, 1.2, "mg/dL"),
    Row::Direct("Albumin", 3.5, 5.0, "g/dL"),
    Row::Direct("TSH", 0.4, 4.5, "uIU/mL"),
    Row::Direct("Sodium", 135.0, 145.0, "mmol/L"),
    Row::Direct("Potassium", 3.5, 5.1, "mmol/L"),
    Row::Direct("Calcium", 8.5, 10.5, "mg/dL"),
    Row::BySex("Ferritin", (24.0, 336.0), (11.0, 307.0), "ng/mL"),
    Row::Direct("Serum_Iron", 60.0, 170.0, "ug/dL"),
    Row::Adult("Vitamin_B12", 200.0, 900.0, "pg/mL"),
];

/// Reference range declarations in catalogue order.
#[must_use]
pub fn reference_ranges() -> Vec<(String, ReferenceSpec)> {
    RANGES
        .iter()
        .map(|row| match *row {
            Row::Direct(name, low, high, unit) => (name.to_string(), ReferenceSpec::direct(low, high, unit)),
            Row::BySex(name, (ml, mh), (fl, fh), unit) => (
                name.to_string(),
                ReferenceSpec::by_sex(Bounds::new(ml, mh), Bounds::new(fl, fh), unit),
            ),
            Row::Adult(name, low, high, unit) => (
                name.to_string(),
                ReferenceSpec::adult(Bounds::new(low, high), unit),
            ),
        })
        .collect()
}
