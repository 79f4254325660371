pub mod detection {
    pub mod domain {
        pub mod detection_record;
        pub mod face_detector;
    }
    pub mod infrastructure;
}

pub mod gating {
    pub mod domain {
        pub mod acceptance;
        pub mod candidate_ranker;
        pub mod crop_geometry;
        pub mod face_gate;
        pub mod gate_config;
        pub mod normalizer;
        pub mod pipeline_outcome;
    }
}

pub mod imaging {
    pub mod domain {
        pub mod frame_decoder;
        pub mod image_writer;
        pub mod payload;
    }
    pub mod infrastructure;
}

pub mod scoring {
    pub mod domain {
        pub mod quality_level;
        pub mod quality_scorer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod assess_quality_use_case;
    pub mod evaluate_frame_use_case;
    pub mod gate_logger;
}

pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod onnx_session;
}
