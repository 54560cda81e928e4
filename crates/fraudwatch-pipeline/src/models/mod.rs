pub mod classifier;
pub mod forest;
pub mod linear;
pub mod stacking;

pub use classifier::Classifier;
pub use forest::BaggedTreesClassifier;
pub use linear::LogisticRegression;
pub use stacking::StackedClassifier;
