use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("🚀 Starting enrichment ETL process");

        // Extract
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("📥 Extracted {} records", raw_data.len());
        self.monitor.log_stats("extract", raw_data.len());

        // Transform
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!(
            "🔄 Transformed {} records ({} enriched, {} degraded)",
            transformed.summary.total,
            transformed.summary.enriched,
            transformed.summary.degraded
        );
        self.monitor
            .log_stats("transform", transformed.processed_records.len());

        // Load
        let records = transformed.processed_records.len();
        let output_path = self.pipeline.load(transformed).await?;
        tracing::info!("📁 Output saved to: {}", output_path);
        self.monitor.log_stats("load", records);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
