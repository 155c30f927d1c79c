pub mod backend_dto;
