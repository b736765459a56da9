pub mod plink_labels;
pub mod stage1_biomarkers;
pub mod stage2_store;
pub mod stage3_select;
pub mod stage4_stats;
pub mod stage5_views;
pub mod stage6_report;
