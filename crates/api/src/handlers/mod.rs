pub mod sequence_templates;
