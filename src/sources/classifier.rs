//! Keyword-driven category classification.
//!
//! Each ecosystem carries its own fixed vocabulary mapping free-text markers
//! to catalog categories. Classification is pure and deterministic so that
//! re-ingesting identical registry data is idempotent.

use std::collections::BTreeSet;

/// Category assigned when a package looks AI-related but matches no
/// vocabulary entry.
const AI_CATEGORY: &str = "Artificial Intelligence";

/// A fixed substring → category lookup table for one ecosystem.
#[derive(Debug)]
pub struct Vocabulary {
    /// Lowercase needle → category name. Checked against both the package
    /// identifier and its description; matches are unioned.
    table: &'static [(&'static str, &'static str)],

    /// Identifier markers that rescue an otherwise-unclassified package into
    /// the generic AI category.
    ai_markers: &'static [&'static str],

    /// Ecosystem-generic fallback when nothing matched at all.
    default_category: &'static str,
}

pub const PYPI: Vocabulary = Vocabulary {
    table: &[
        ("nlp", "Natural Language Processing"),
        ("natural language", "Natural Language Processing"),
        ("text", "Natural Language Processing"),
        ("machine learning", "Machine Learning"),
        ("deep learning", "Deep Learning"),
        ("neural", "Neural Networks"),
        ("ai", "Artificial Intelligence"),
        ("vision", "Computer Vision"),
        ("image", "Computer Vision"),
        ("video", "Computer Vision"),
        ("voice", "Speech Processing"),
        ("speech", "Speech Processing"),
        ("audio", "Speech Processing"),
        ("reinforcement", "Reinforcement Learning"),
        ("rl", "Reinforcement Learning"),
        ("generation", "Generative AI"),
        ("generative", "Generative AI"),
        ("llm", "Large Language Models"),
        ("language model", "Large Language Models"),
    ],
    ai_markers: &[],
    default_category: "Artificial Intelligence",
};

pub const NPM: Vocabulary = Vocabulary {
    table: &[
        ("nlp", "Natural Language Processing"),
        ("natural-language", "Natural Language Processing"),
        ("text", "Natural Language Processing"),
        ("machine-learning", "Machine Learning"),
        ("deep-learning", "Deep Learning"),
        ("neural", "Neural Networks"),
        ("ai", "Artificial Intelligence"),
        ("vision", "Computer Vision"),
        ("image", "Computer Vision"),
        ("video", "Computer Vision"),
        ("voice", "Speech Processing"),
        ("speech", "Speech Processing"),
        ("audio", "Speech Processing"),
        ("reinforcement", "Reinforcement Learning"),
        ("rl", "Reinforcement Learning"),
        ("generation", "Generative AI"),
        ("generative", "Generative AI"),
        ("llm", "Large Language Models"),
        ("language-model", "Large Language Models"),
        ("tensorflow", "Machine Learning"),
        ("face", "Computer Vision"),
        ("gpt", "Large Language Models"),
    ],
    ai_markers: &["ai", "ml", "tensorflow", "neural", "brain", "mind", "nlp", "language", "gpt", "openai"],
    default_category: "JavaScript Libraries",
};

pub const NUGET: Vocabulary = Vocabulary {
    table: &[
        ("ml", "Machine Learning"),
        ("machinelearning", "Machine Learning"),
        ("tensorflow", "Deep Learning"),
        ("neural", "Neural Networks"),
        ("ai", "Artificial Intelligence"),
        ("vision", "Computer Vision"),
        ("image", "Computer Vision"),
        ("nlp", "Natural Language Processing"),
        ("text", "Natural Language Processing"),
        ("voice", "Speech Processing"),
        ("speech", "Speech Processing"),
        ("recommend", "Recommendation Systems"),
        ("lightgbm", "Machine Learning"),
        ("fasttree", "Machine Learning"),
        ("automl", "AutoML"),
    ],
    ai_markers: &["ml", "ai"],
    default_category: ".NET Libraries",
};

pub const MAVEN: Vocabulary = Vocabulary {
    table: &[
        ("ml", "Machine Learning"),
        ("machinelearning", "Machine Learning"),
        ("deeplearning", "Deep Learning"),
        ("tensorflow", "Deep Learning"),
        ("neural", "Neural Networks"),
        ("ai", "Artificial Intelligence"),
        ("djl", "Deep Learning"),
        ("vision", "Computer Vision"),
        ("image", "Computer Vision"),
        ("nlp", "Natural Language Processing"),
        ("language", "Natural Language Processing"),
        ("text", "Natural Language Processing"),
        ("voice", "Speech Processing"),
        ("speech", "Speech Processing"),
        ("mahout", "Machine Learning"),
        ("weka", "Machine Learning"),
        ("spark-mllib", "Machine Learning"),
        ("tribuo", "Machine Learning"),
        ("nd4j", "Scientific Computing"),
    ],
    ai_markers: &["ai", "ml", "learn", "deeplearning", "tensorflow", "neural"],
    default_category: "Java Libraries",
};

impl Vocabulary {
    /// Map a package identifier and description to a non-empty set of
    /// category names. Pure and side-effect-free; identical inputs always
    /// produce the identical set.
    #[must_use]
    pub fn classify(&self, identifier: &str, description: &str) -> BTreeSet<String> {
        let identifier = identifier.to_lowercase();
        let description = description.to_lowercase();

        let mut categories = BTreeSet::new();
        for (needle, category) in self.table {
            if identifier.contains(needle) || description.contains(needle) {
                let _ = categories.insert((*category).to_string());
            }
        }

        if categories.is_empty() {
            let fallback = if self.ai_markers.iter().any(|marker| identifier.contains(marker)) {
                AI_CATEGORY
            } else {
                self.default_category
            };
            let _ = categories.insert(fallback.to_string());
        }

        categories
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_deterministic() {
        let first = PYPI.classify("transformers", "nlp, deep learning, pytorch");
        let second = PYPI.classify("transformers", "nlp, deep learning, pytorch");

        assert_eq!(first, second);
    }

    #[test]
    fn test_deep_learning_description_matches() {
        let categories = PYPI.classify("tensorflow.js", "deep learning in the browser");

        assert!(categories.contains("Deep Learning"));
    }

    #[test]
    fn test_identifier_and_description_matches_are_unioned() {
        let categories = PYPI.classify("vision-kit", "reinforcement learning toolkit");

        assert!(categories.contains("Computer Vision"));
        assert!(categories.contains("Reinforcement Learning"));
    }

    #[test]
    fn test_ai_suffix_in_name_classifies_as_ai() {
        let categories = PYPI.classify("widget-ai", "");

        assert!(categories.contains("Artificial Intelligence"));
    }

    #[test]
    fn test_unmatched_package_falls_back_to_ecosystem_default() {
        assert_eq!(
            NPM.classify("left-pad", "pads strings on the left"),
            BTreeSet::from(["JavaScript Libraries".to_string()])
        );
        assert_eq!(
            MAVEN.classify("org.example:http-utils", "http helpers"),
            BTreeSet::from(["Java Libraries".to_string()])
        );
    }

    #[test]
    fn test_ai_marker_rescues_unclassified_identifier() {
        // "mindjs" matches no table entry but carries an AI marker.
        let categories = NPM.classify("mindjs", "");

        assert_eq!(categories, BTreeSet::from(["Artificial Intelligence".to_string()]));
    }

    #[test]
    fn test_result_is_never_empty() {
        for vocabulary in [&PYPI, &NPM, &NUGET, &MAVEN] {
            assert!(!vocabulary.classify("", "").is_empty());
        }
    }
}
