pub mod shared {
    pub mod constants;
    pub mod font_resolver;
    pub mod frame;
    pub mod media_asset;
    pub mod scratch_space;
    pub mod settings;
}

pub mod audio {
    pub mod domain {
        pub mod transcript;
        pub mod transcription_client;
        pub mod waveform;
    }
    pub mod infrastructure {
        pub mod http_transcription_client;
        pub mod timeout_transcription_client;
        #[cfg(feature = "whisper")]
        pub mod whisper_transcription_client;
    }
}

pub mod video {
    pub mod domain {
        pub mod audio_extractor;
        pub mod video_encoder;
        pub mod video_reader;
    }
    pub mod infrastructure {
        pub mod caching_audio_extractor;
        pub mod ffmpeg_audio_extractor;
        pub mod ffmpeg_encoder;
        pub mod ffmpeg_reader;
    }
}

pub mod subtitle {
    pub mod domain {
        pub mod cue_renderer;
        pub mod rendered_overlay;
        pub mod subtitle_cue;
        pub mod subtitle_document;
        pub mod subtitle_segmenter;
        pub mod subtitle_style;
        pub mod tokenizer;
    }
    pub mod infrastructure {
        pub mod glyph_cue_renderer;
    }
}

pub mod compositing {
    pub mod domain {
        pub mod frame_compositor;
    }
}

pub mod pipeline {
    pub mod burn_subtitles_use_case;
    pub mod pipeline_executor;
    pub mod pipeline_logger;
    pub mod pipeline_state;
    pub mod infrastructure {
        pub mod pipeline_factory;
        pub mod threaded_pipeline_executor;
    }
}
