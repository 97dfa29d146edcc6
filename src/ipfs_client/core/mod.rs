mod aggregator;

pub use aggregator::NodeProbe;
